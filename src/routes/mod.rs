pub mod export;
pub mod health;
pub mod openapi;
pub mod play;
pub mod question_routes;
pub mod result_routes;
pub mod test_routes;
pub mod upload;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};

use crate::middleware::{auth, rate_limit};
use crate::AppState;

/// All API routes with their auth and rate-limit layers. Static file serving,
/// CORS and tracing are added by the binary.
pub fn router(
    state: AppState,
    owner_rps: u32,
    public_rps: u32,
    trust_forwarded_for: bool,
) -> Router {
    let base_routes = Router::new()
        .route("/health", get(health::health))
        .route("/api/openapi.json", get(openapi::openapi_json));

    let owner_api = Router::new()
        .route(
            "/api/tests",
            get(test_routes::list_tests).post(test_routes::create_test),
        )
        .route(
            "/api/tests/:id",
            get(test_routes::get_test)
                .patch(test_routes::update_test)
                .delete(test_routes::delete_test),
        )
        .route(
            "/api/tests/:id/welcome-screen",
            put(test_routes::upsert_welcome_screen),
        )
        .route("/api/tests/:id/publish", post(test_routes::publish_test))
        .route("/api/tests/:id/analytics", get(export::get_analytics))
        .route(
            "/api/tests/:id/analytics/export",
            get(export::export_analytics),
        )
        .route(
            "/api/tests/:id/questions",
            post(question_routes::create_question),
        )
        .route(
            "/api/tests/:id/questions/order",
            put(question_routes::reorder_questions),
        )
        .route(
            "/api/questions/:id",
            axum::routing::patch(question_routes::update_question)
                .delete(question_routes::delete_question),
        )
        .route(
            "/api/questions/:id/answers",
            post(question_routes::create_answer),
        )
        .route(
            "/api/questions/:id/answers/order",
            put(question_routes::reorder_answers),
        )
        .route(
            "/api/answers/:id",
            axum::routing::patch(question_routes::update_answer)
                .delete(question_routes::delete_answer),
        )
        .route(
            "/api/tests/:id/results",
            get(result_routes::list_results).post(result_routes::create_result),
        )
        .route(
            "/api/results/:id",
            axum::routing::patch(result_routes::update_result)
                .delete(result_routes::delete_result),
        )
        .route(
            "/api/uploads/images",
            post(upload::upload_image).layer(DefaultBodyLimit::max(
                state.upload_service.max_bytes() + 64 * 1024,
            )),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::require_telegram_user,
        ))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit::RateLimiter::new(owner_rps).trusting_forwarded_for(trust_forwarded_for),
            rate_limit::rps_middleware,
        ));

    let play_api = Router::new()
        .route("/api/play/:slug", get(play::get_by_slug))
        .route("/api/play/:slug/session", get(play::get_session))
        .route("/api/play/:slug/start", post(play::start))
        .route("/api/play/:slug/submit", post(play::submit))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::require_telegram_user,
        ))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit::RateLimiter::new(public_rps).trusting_forwarded_for(trust_forwarded_for),
            rate_limit::rps_middleware,
        ));

    base_routes
        .merge(owner_api)
        .merge(play_api)
        .with_state(state)
}
