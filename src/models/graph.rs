use serde::Serialize;
use sqlx::PgConnection;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::Result;
use crate::models::answer::{Answer, AnswerResultPoint};
use crate::models::question::Question;
use crate::models::test::Test;
use crate::models::test_result::TestResult;
use crate::models::welcome_screen::WelcomeScreen;

/// A fully loaded test definition: the shape the validator, the scoring
/// engine and the analytics aggregator work on.
#[derive(Debug, Clone, Serialize)]
pub struct TestGraph {
    pub test: Test,
    pub welcome_screen: Option<WelcomeScreen>,
    pub questions: Vec<QuestionNode>,
    pub results: Vec<TestResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionNode {
    #[serde(flatten)]
    pub question: Question,
    pub answers: Vec<AnswerNode>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerNode {
    #[serde(flatten)]
    pub answer: Answer,
    pub points: Vec<ResultPoints>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResultPoints {
    pub result_id: Uuid,
    pub points: i32,
}

impl TestGraph {
    /// Loads every child record of `test`. Questions and answers come back in
    /// their stored order, results and points in result creation order.
    pub async fn load(conn: &mut PgConnection, test: Test) -> Result<Self> {
        let welcome_screen = sqlx::query_as::<_, WelcomeScreen>(
            r#"SELECT * FROM welcome_screens WHERE test_id = $1"#,
        )
        .bind(test.id)
        .fetch_optional(&mut *conn)
        .await?;

        let questions = sqlx::query_as::<_, Question>(
            r#"SELECT * FROM questions WHERE test_id = $1 ORDER BY order_index, created_at"#,
        )
        .bind(test.id)
        .fetch_all(&mut *conn)
        .await?;

        let answers = sqlx::query_as::<_, Answer>(
            r#"
            SELECT a.*
            FROM answers a
            JOIN questions q ON q.id = a.question_id
            WHERE q.test_id = $1
            ORDER BY q.order_index, a.order_index, a.created_at
            "#,
        )
        .bind(test.id)
        .fetch_all(&mut *conn)
        .await?;

        let points = sqlx::query_as::<_, AnswerResultPoint>(
            r#"
            SELECT p.*
            FROM answer_result_points p
            JOIN answers a ON a.id = p.answer_id
            JOIN questions q ON q.id = a.question_id
            JOIN results r ON r.id = p.result_id
            WHERE q.test_id = $1
            ORDER BY r.created_at, r.id
            "#,
        )
        .bind(test.id)
        .fetch_all(&mut *conn)
        .await?;

        let results = sqlx::query_as::<_, TestResult>(
            r#"SELECT * FROM results WHERE test_id = $1 ORDER BY created_at, id"#,
        )
        .bind(test.id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(Self::assemble(test, welcome_screen, questions, answers, points, results))
    }

    pub fn assemble(
        test: Test,
        welcome_screen: Option<WelcomeScreen>,
        questions: Vec<Question>,
        answers: Vec<Answer>,
        points: Vec<AnswerResultPoint>,
        results: Vec<TestResult>,
    ) -> Self {
        let mut points_by_answer: HashMap<Uuid, Vec<ResultPoints>> = HashMap::new();
        for p in points {
            points_by_answer.entry(p.answer_id).or_default().push(ResultPoints {
                result_id: p.result_id,
                points: p.points,
            });
        }

        let mut answers_by_question: HashMap<Uuid, Vec<AnswerNode>> = HashMap::new();
        for answer in answers {
            let points = points_by_answer.remove(&answer.id).unwrap_or_default();
            answers_by_question
                .entry(answer.question_id)
                .or_default()
                .push(AnswerNode { answer, points });
        }

        let questions = questions
            .into_iter()
            .map(|question| {
                let mut answers = answers_by_question.remove(&question.id).unwrap_or_default();
                answers.sort_by_key(|a| a.answer.order_index);
                QuestionNode { question, answers }
            })
            .collect();

        Self {
            test,
            welcome_screen,
            questions,
            results,
        }
    }

    pub fn question(&self, question_id: Uuid) -> Option<&QuestionNode> {
        self.questions.iter().find(|q| q.question.id == question_id)
    }

    pub fn result(&self, result_id: Uuid) -> Option<&TestResult> {
        self.results.iter().find(|r| r.id == result_id)
    }
}

impl QuestionNode {
    pub fn answer(&self, answer_id: Uuid) -> Option<&AnswerNode> {
        self.answers.iter().find(|a| a.answer.id == answer_id)
    }
}
