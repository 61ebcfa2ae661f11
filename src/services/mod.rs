pub mod analytics_service;
pub mod answer_service;
pub mod export_service;
pub mod guard;
pub mod notification_service;
pub mod ordering;
pub mod publish_validator;
pub mod question_service;
pub mod result_service;
pub mod scoring;
pub mod session_service;
pub mod test_service;
pub mod upload_service;
pub mod user_service;
