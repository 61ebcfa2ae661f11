use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::dto::{double_option, trim_optional_string};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateQuestionPayload {
    #[validate(length(min = 1, max = 1000, message = "Question text must be 1-1000 characters"))]
    pub text: String,
    #[validate(length(max = 500))]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateQuestionPayload {
    #[serde(default, deserialize_with = "trim_optional_string")]
    #[validate(length(max = 1000))]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub image_url: Option<Option<String>>,
}

/// New order for all children of a parent, first id gets order 0.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReorderPayload {
    #[validate(length(min = 1))]
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PointsInput {
    pub result_id: Uuid,
    pub points: i32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAnswerPayload {
    #[validate(length(min = 1, max = 500, message = "Answer text must be 1-500 characters"))]
    pub text: String,
    #[validate(length(max = 500))]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_correct: bool,
    pub next_question_id: Option<Uuid>,
    pub result_id: Option<Uuid>,
    #[serde(default)]
    pub points: Vec<PointsInput>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateAnswerPayload {
    #[serde(default, deserialize_with = "trim_optional_string")]
    #[validate(length(max = 500))]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub image_url: Option<Option<String>>,
    pub is_correct: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub next_question_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "double_option")]
    pub result_id: Option<Option<Uuid>>,
    /// Replaces the whole point list when present.
    pub points: Option<Vec<PointsInput>>,
}
