use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json},
    Extension,
};
use validator::Validate;

use crate::dto::play_dto::{PlayTest, SubmitPayload};
use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::AppState;

#[utoipa::path(
    get,
    path = "/api/play/{slug}",
    params(("slug" = String, Path, description = "Public test slug")),
    responses(
        (status = 200, description = "Player view of a published test"),
        (status = 404, description = "No published test with this slug")
    )
)]
#[axum::debug_handler]
pub async fn get_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse> {
    let graph = state.session_service.get_published_by_slug(&slug).await?;
    Ok(Json(PlayTest::from(&graph)))
}

#[utoipa::path(
    get,
    path = "/api/play/{slug}/session",
    params(("slug" = String, Path, description = "Public test slug")),
    responses((status = 200, description = "Caller's session or null"))
)]
#[axum::debug_handler]
pub async fn get_session(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse> {
    let session = state.session_service.get_session(user.user_id, &slug).await?;
    Ok(Json(session))
}

#[utoipa::path(
    post,
    path = "/api/play/{slug}/start",
    params(("slug" = String, Path, description = "Public test slug")),
    responses(
        (status = 200, description = "Session in progress"),
        (status = 409, description = "Already completed and retakes are off")
    )
)]
#[axum::debug_handler]
pub async fn start(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse> {
    tracing::info!(slug = %slug, user_id = %user.user_id, "Starting test");
    let session = state.session_service.start(user.user_id, &slug).await?;
    Ok(Json(session))
}

#[utoipa::path(
    post,
    path = "/api/play/{slug}/submit",
    params(("slug" = String, Path, description = "Public test slug")),
    responses(
        (status = 200, description = "Outcome with the resolved result"),
        (status = 400, description = "Answer does not belong to the test"),
        (status = 409, description = "No session in progress")
    )
)]
#[axum::debug_handler]
pub async fn submit(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(slug): Path<String>,
    Json(payload): Json<SubmitPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let response = state
        .session_service
        .submit(user.user_id, &slug, payload.answers)
        .await?;
    Ok(Json(response))
}
