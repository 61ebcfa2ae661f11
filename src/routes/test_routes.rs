use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::test_dto::{
        CreateTestPayload, ListTestsQuery, UpdateTestPayload, UpsertWelcomeScreenPayload,
    },
    error::Result,
    middleware::auth::AuthUser,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/tests",
    responses(
        (status = 201, description = "Draft test created"),
        (status = 403, description = "Test quota reached"),
        (status = 422, description = "Invalid payload")
    )
)]
#[axum::debug_handler]
pub async fn create_test(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateTestPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let test = state.test_service.create_test(user.user_id, payload).await?;
    Ok((StatusCode::CREATED, Json(test)))
}

#[utoipa::path(
    get,
    path = "/api/tests",
    params(
        ("page" = Option<i64>, Query, description = "Page number, 1-based"),
        ("per_page" = Option<i64>, Query, description = "Page size, at most 100"),
        ("status" = Option<String>, Query, description = "draft or published")
    ),
    responses((status = 200, description = "Caller's tests, newest first"))
)]
#[axum::debug_handler]
pub async fn list_tests(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ListTestsQuery>,
) -> Result<impl IntoResponse> {
    let page = state.test_service.list_tests(user.user_id, query).await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/tests/{id}",
    params(("id" = Uuid, Path, description = "Test ID")),
    responses(
        (status = 200, description = "Full test graph"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Test not found")
    )
)]
#[axum::debug_handler]
pub async fn get_test(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let graph = state.test_service.get_graph(user.user_id, id).await?;
    Ok(Json(graph))
}

#[utoipa::path(
    patch,
    path = "/api/tests/{id}",
    params(("id" = Uuid, Path, description = "Test ID")),
    responses(
        (status = 200, description = "Test updated"),
        (status = 409, description = "Test is published")
    )
)]
#[axum::debug_handler]
pub async fn update_test(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTestPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let test = state.test_service.update_test(user.user_id, id, payload).await?;
    Ok(Json(test))
}

#[utoipa::path(
    delete,
    path = "/api/tests/{id}",
    params(("id" = Uuid, Path, description = "Test ID")),
    responses(
        (status = 204, description = "Test deleted"),
        (status = 404, description = "Test not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_test(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.test_service.delete_test(user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/api/tests/{id}/welcome-screen",
    params(("id" = Uuid, Path, description = "Test ID")),
    responses(
        (status = 200, description = "Welcome screen saved"),
        (status = 409, description = "Test is published")
    )
)]
#[axum::debug_handler]
pub async fn upsert_welcome_screen(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpsertWelcomeScreenPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let screen = state
        .test_service
        .upsert_welcome_screen(user.user_id, id, payload)
        .await?;
    Ok(Json(screen))
}

#[utoipa::path(
    post,
    path = "/api/tests/{id}/publish",
    params(("id" = Uuid, Path, description = "Test ID")),
    responses(
        (status = 200, description = "Test published with a slug"),
        (status = 409, description = "Already published"),
        (status = 422, description = "Test is not ready to publish")
    )
)]
#[axum::debug_handler]
pub async fn publish_test(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let test = state.test_service.publish(user.user_id, id).await?;
    Ok(Json(test))
}
