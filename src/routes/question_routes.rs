use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::question_dto::{
        CreateAnswerPayload, CreateQuestionPayload, ReorderPayload, UpdateAnswerPayload,
        UpdateQuestionPayload,
    },
    error::Result,
    middleware::auth::AuthUser,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/tests/{id}/questions",
    params(("id" = Uuid, Path, description = "Test ID")),
    responses(
        (status = 201, description = "Question appended"),
        (status = 403, description = "Question limit reached or not the owner"),
        (status = 409, description = "Test is published")
    )
)]
#[axum::debug_handler]
pub async fn create_question(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(test_id): Path<Uuid>,
    Json(payload): Json<CreateQuestionPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let question = state
        .question_service
        .create_question(user.user_id, test_id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(question)))
}

#[utoipa::path(
    put,
    path = "/api/tests/{id}/questions/order",
    params(("id" = Uuid, Path, description = "Test ID")),
    responses(
        (status = 200, description = "Questions in their new order"),
        (status = 400, description = "Ids are not a permutation of the test's questions")
    )
)]
#[axum::debug_handler]
pub async fn reorder_questions(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(test_id): Path<Uuid>,
    Json(payload): Json<ReorderPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let questions = state
        .question_service
        .reorder_questions(user.user_id, test_id, payload)
        .await?;
    Ok(Json(questions))
}

#[utoipa::path(
    patch,
    path = "/api/questions/{id}",
    params(("id" = Uuid, Path, description = "Question ID")),
    responses((status = 200, description = "Question updated"))
)]
#[axum::debug_handler]
pub async fn update_question(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateQuestionPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let question = state
        .question_service
        .update_question(user.user_id, id, payload)
        .await?;
    Ok(Json(question))
}

#[utoipa::path(
    delete,
    path = "/api/questions/{id}",
    params(("id" = Uuid, Path, description = "Question ID")),
    responses((status = 204, description = "Question deleted, siblings re-packed"))
)]
#[axum::debug_handler]
pub async fn delete_question(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.question_service.delete_question(user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/questions/{id}/answers",
    params(("id" = Uuid, Path, description = "Question ID")),
    responses(
        (status = 201, description = "Answer appended"),
        (status = 400, description = "Reference outside the test")
    )
)]
#[axum::debug_handler]
pub async fn create_answer(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(question_id): Path<Uuid>,
    Json(payload): Json<CreateAnswerPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let answer = state
        .answer_service
        .create_answer(user.user_id, question_id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(answer)))
}

#[utoipa::path(
    put,
    path = "/api/questions/{id}/answers/order",
    params(("id" = Uuid, Path, description = "Question ID")),
    responses((status = 200, description = "Answers in their new order"))
)]
#[axum::debug_handler]
pub async fn reorder_answers(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(question_id): Path<Uuid>,
    Json(payload): Json<ReorderPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let answers = state
        .answer_service
        .reorder_answers(user.user_id, question_id, payload)
        .await?;
    Ok(Json(answers))
}

#[utoipa::path(
    patch,
    path = "/api/answers/{id}",
    params(("id" = Uuid, Path, description = "Answer ID")),
    responses((status = 200, description = "Answer updated"))
)]
#[axum::debug_handler]
pub async fn update_answer(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAnswerPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let answer = state
        .answer_service
        .update_answer(user.user_id, id, payload)
        .await?;
    Ok(Json(answer))
}

#[utoipa::path(
    delete,
    path = "/api/answers/{id}",
    params(("id" = Uuid, Path, description = "Answer ID")),
    responses((status = 204, description = "Answer deleted, siblings re-packed"))
)]
#[axum::debug_handler]
pub async fn delete_answer(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.answer_service.delete_answer(user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
