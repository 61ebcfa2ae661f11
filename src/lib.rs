pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

#[cfg(test)]
mod test_support;

use std::sync::Arc;
use std::time::Duration;

use crate::services::{
    analytics_service::AnalyticsService, answer_service::AnswerService,
    notification_service::NotificationService, question_service::QuestionService,
    result_service::ResultService, session_service::SessionService, test_service::TestService,
    upload_service::UploadService, user_service::UserService,
};
use crate::utils::slug::RandomSlugGenerator;
use reqwest::Client;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub user_service: UserService,
    pub test_service: TestService,
    pub question_service: QuestionService,
    pub answer_service: AnswerService,
    pub result_service: ResultService,
    pub session_service: SessionService,
    pub analytics_service: AnalyticsService,
    pub upload_service: UploadService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let config = crate::config::get_config();
        let http_client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| Client::new());

        let notifier = NotificationService::new(
            http_client,
            config.telegram_bot_token.clone(),
            config.notify_owners,
        );

        Self {
            user_service: UserService::new(pool.clone()),
            test_service: TestService::new(
                pool.clone(),
                Arc::new(RandomSlugGenerator),
                config.max_tests_per_user,
            ),
            question_service: QuestionService::new(pool.clone(), config.max_questions_per_test),
            answer_service: AnswerService::new(pool.clone()),
            result_service: ResultService::new(pool.clone()),
            session_service: SessionService::new(pool.clone(), notifier),
            analytics_service: AnalyticsService::new(pool.clone()),
            upload_service: UploadService::new(&config.uploads_dir, config.max_upload_bytes),
            pool,
        }
    }
}
