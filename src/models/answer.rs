use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Answer {
    pub id: Uuid,
    pub question_id: Uuid,
    #[serde(rename = "order")]
    pub order_index: i32,
    pub text: String,
    pub image_url: Option<String>,
    pub is_correct: bool,
    pub next_question_id: Option<Uuid>,
    pub result_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Points an answer awards toward a result in a personality test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct AnswerResultPoint {
    pub id: Uuid,
    pub answer_id: Uuid,
    pub result_id: Uuid,
    pub points: i32,
}
