use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;

use crate::{
    error::Result, middleware::auth::AuthUser, services::export_service::ExportService, AppState,
};

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[utoipa::path(
    get,
    path = "/api/tests/{id}/analytics",
    params(("id" = Uuid, Path, description = "Test ID")),
    responses(
        (status = 200, description = "Session, answer and result statistics"),
        (status = 403, description = "Not the owner")
    )
)]
#[axum::debug_handler]
pub async fn get_analytics(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let analytics = state.analytics_service.for_test(user.user_id, id).await?;
    Ok(Json(analytics))
}

/// Analytics as an XLSX workbook.
#[utoipa::path(
    get,
    path = "/api/tests/{id}/analytics/export",
    params(("id" = Uuid, Path, description = "Test ID")),
    responses((status = 200, description = "XLSX workbook"))
)]
#[axum::debug_handler]
pub async fn export_analytics(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let test = state.test_service.get_test(user.user_id, id).await?;
    let analytics = state.analytics_service.for_test(user.user_id, id).await?;
    let buffer = ExportService::analytics_xlsx(&test.title, &analytics)?;

    let filename = format!(
        "analytics_{}_{}.xlsx",
        test.slug.as_deref().unwrap_or("draft"),
        chrono::Utc::now().format("%Y%m%d")
    );
    let disposition = format!("attachment; filename=\"{}\"", filename);

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, XLSX_MIME.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        buffer,
    ))
}
