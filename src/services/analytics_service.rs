use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::analytics_dto::{AnswerStats, QuestionStats, ResultStats, TestAnalytics};
use crate::error::Result;
use crate::models::graph::TestGraph;
use crate::models::test::TestType;
use crate::models::user_session::{UserAnswer, UserSession};
use crate::services::guard;

#[derive(Clone)]
pub struct AnalyticsService {
    pool: PgPool,
}

impl AnalyticsService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Owner-only, available in any lifecycle state.
    pub async fn for_test(&self, owner_id: Uuid, test_id: Uuid) -> Result<TestAnalytics> {
        let mut conn = self.pool.acquire().await?;
        let test = guard::owned_test(&mut conn, test_id, owner_id).await?;
        let graph = TestGraph::load(&mut conn, test).await?;

        let sessions = sqlx::query_as::<_, UserSession>(
            r#"SELECT * FROM user_sessions WHERE test_id = $1"#,
        )
        .bind(test_id)
        .fetch_all(&mut *conn)
        .await?;

        let answers = sqlx::query_as::<_, UserAnswer>(
            r#"
            SELECT ua.*
            FROM user_answers ua
            JOIN user_sessions s ON s.id = ua.session_id
            WHERE s.test_id = $1
            "#,
        )
        .bind(test_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(summarize(&graph, &sessions, &answers))
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn percentage(part: i64, whole: i64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        round1(part as f64 / whole as f64 * 100.0)
    }
}

pub fn summarize(graph: &TestGraph, sessions: &[UserSession], answers: &[UserAnswer]) -> TestAnalytics {
    let total_sessions = sessions.len() as i64;
    let completed: Vec<&UserSession> = sessions.iter().filter(|s| s.is_completed()).collect();
    let completed_sessions = completed.len() as i64;

    let average_score = match graph.test.test_type {
        TestType::Quiz => {
            let scores: Vec<i32> = completed.iter().filter_map(|s| s.score).collect();
            if scores.is_empty() {
                None
            } else {
                let sum: i64 = scores.iter().map(|s| *s as i64).sum();
                Some(round1(sum as f64 / scores.len() as f64))
            }
        }
        TestType::Personality | TestType::Branching => None,
    };

    let questions = graph
        .questions
        .iter()
        .map(|node| {
            let recorded: Vec<&UserAnswer> = answers
                .iter()
                .filter(|a| a.question_id == node.question.id)
                .collect();
            let total_answers = recorded.len() as i64;
            let answers = node
                .answers
                .iter()
                .map(|option| {
                    let count = recorded
                        .iter()
                        .filter(|a| a.answer_id == option.answer.id)
                        .count() as i64;
                    AnswerStats {
                        answer_id: option.answer.id,
                        text: option.answer.text.clone(),
                        count,
                        percentage: percentage(count, total_answers),
                    }
                })
                .collect();
            QuestionStats {
                question_id: node.question.id,
                order: node.question.order_index,
                text: node.question.text.clone(),
                total_answers,
                answers,
            }
        })
        .collect();

    let results = graph
        .results
        .iter()
        .map(|r| {
            let count = completed
                .iter()
                .filter(|s| s.result_id == Some(r.id))
                .count() as i64;
            ResultStats {
                result_id: r.id,
                title: r.title.clone(),
                count,
                percentage: percentage(count, completed_sessions),
            }
        })
        .collect();

    TestAnalytics {
        test_id: graph.test.id,
        test_type: graph.test.test_type,
        total_sessions,
        completed_sessions,
        completion_rate: percentage(completed_sessions, total_sessions),
        average_score,
        questions,
        results,
    }
}
