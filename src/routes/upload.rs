use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use serde_json::json;

use crate::error::{Error, Result};
use crate::middleware::auth::AuthUser;
use crate::AppState;

#[utoipa::path(
    post,
    path = "/api/uploads/images",
    responses(
        (status = 201, description = "Image stored, returns its URL"),
        (status = 400, description = "Missing, oversized or mismatched file")
    )
)]
#[axum::debug_handler]
pub async fn upload_image(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let data = field.bytes().await?;
        let url = state.upload_service.store_image(&filename, &data).await?;
        tracing::info!(user_id = %user.user_id, url = %url, "Image uploaded");
        return Ok((StatusCode::CREATED, Json(json!({ "url": url }))));
    }
    Err(Error::BadRequest("Multipart field 'file' is required".to_string()))
}
