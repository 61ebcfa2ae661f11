use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::result_dto::{CreateResultPayload, UpdateResultPayload},
    error::Result,
    middleware::auth::AuthUser,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/tests/{id}/results",
    params(("id" = Uuid, Path, description = "Test ID")),
    responses((status = 200, description = "Results of the test"))
)]
#[axum::debug_handler]
pub async fn list_results(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(test_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let results = state.result_service.list_results(user.user_id, test_id).await?;
    Ok(Json(results))
}

#[utoipa::path(
    post,
    path = "/api/tests/{id}/results",
    params(("id" = Uuid, Path, description = "Test ID")),
    responses((status = 201, description = "Result created"))
)]
#[axum::debug_handler]
pub async fn create_result(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(test_id): Path<Uuid>,
    Json(payload): Json<CreateResultPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let result = state
        .result_service
        .create_result(user.user_id, test_id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(result)))
}

#[utoipa::path(
    patch,
    path = "/api/results/{id}",
    params(("id" = Uuid, Path, description = "Result ID")),
    responses((status = 200, description = "Result updated"))
)]
#[axum::debug_handler]
pub async fn update_result(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateResultPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let result = state
        .result_service
        .update_result(user.user_id, id, payload)
        .await?;
    Ok(Json(result))
}

#[utoipa::path(
    delete,
    path = "/api/results/{id}",
    params(("id" = Uuid, Path, description = "Result ID")),
    responses(
        (status = 204, description = "Result deleted"),
        (status = 409, description = "Result is still referenced by answers")
    )
)]
#[axum::debug_handler]
pub async fn delete_result(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.result_service.delete_result(user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
