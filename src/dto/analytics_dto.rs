use serde::Serialize;
use uuid::Uuid;

use crate::models::test::TestType;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestAnalytics {
    pub test_id: Uuid,
    #[serde(rename = "type")]
    pub test_type: TestType,
    pub total_sessions: i64,
    pub completed_sessions: i64,
    /// Percentage of sessions that reached completion, one decimal.
    pub completion_rate: f64,
    /// Mean quiz score over completed sessions; `None` for other test types.
    pub average_score: Option<f64>,
    pub questions: Vec<QuestionStats>,
    pub results: Vec<ResultStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionStats {
    pub question_id: Uuid,
    pub order: i32,
    pub text: String,
    pub total_answers: i64,
    pub answers: Vec<AnswerStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerStats {
    pub answer_id: Uuid,
    pub text: String,
    pub count: i64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultStats {
    pub result_id: Uuid,
    pub title: String,
    pub count: i64,
    pub percentage: f64,
}
