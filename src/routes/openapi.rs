use axum::{response::IntoResponse, Json};
use utoipa::OpenApi;

use crate::routes::{
    export, health, play, question_routes, result_routes, test_routes, upload,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        test_routes::create_test,
        test_routes::list_tests,
        test_routes::get_test,
        test_routes::update_test,
        test_routes::delete_test,
        test_routes::upsert_welcome_screen,
        test_routes::publish_test,
        question_routes::create_question,
        question_routes::reorder_questions,
        question_routes::update_question,
        question_routes::delete_question,
        question_routes::create_answer,
        question_routes::reorder_answers,
        question_routes::update_answer,
        question_routes::delete_answer,
        result_routes::list_results,
        result_routes::create_result,
        result_routes::update_result,
        result_routes::delete_result,
        export::get_analytics,
        export::export_analytics,
        upload::upload_image,
        play::get_by_slug,
        play::get_session,
        play::start,
        play::submit,
    ),
    info(title = "Quiz App API", description = "Telegram Mini App test builder")
)]
pub struct ApiDoc;

pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
