use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::dto::play_dto::{SessionView, SubmitResponse};
use crate::error::{Error, Result};
use crate::models::graph::TestGraph;
use crate::models::test::Test;
use crate::models::test_result::TestResult;
use crate::models::user::User;
use crate::models::user_session::{UserAnswer, UserSession};
use crate::services::notification_service::{Completion, NotificationService};
use crate::services::scoring::{self, Outcome, Submission};

#[derive(Clone)]
pub struct SessionService {
    pool: PgPool,
    notifier: NotificationService,
}

async fn published_test(conn: &mut PgConnection, slug: &str) -> Result<Test> {
    sqlx::query_as::<_, Test>(r#"SELECT * FROM tests WHERE slug = $1 AND status = 'published'"#)
        .bind(slug)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::NotFound("Test not found".to_string()))
}

/// Every pair must name a question of the test and one of that question's
/// answers.
fn check_submissions(graph: &TestGraph, submissions: &[Submission]) -> Result<()> {
    for s in submissions {
        let question = graph.question(s.question_id).ok_or_else(|| {
            Error::BadRequest(format!("Question {} is not part of this test", s.question_id))
        })?;
        if question.answer(s.answer_id).is_none() {
            return Err(Error::BadRequest(format!(
                "Answer {} does not belong to question {}",
                s.answer_id, s.question_id
            )));
        }
    }
    Ok(())
}

impl SessionService {
    pub fn new(pool: PgPool, notifier: NotificationService) -> Self {
        Self { pool, notifier }
    }

    pub async fn get_published_by_slug(&self, slug: &str) -> Result<TestGraph> {
        let mut conn = self.pool.acquire().await?;
        let test = published_test(&mut conn, slug).await?;
        TestGraph::load(&mut conn, test).await
    }

    pub async fn get_session(&self, user_id: Uuid, slug: &str) -> Result<Option<SessionView>> {
        let mut conn = self.pool.acquire().await?;
        let test = published_test(&mut conn, slug).await?;

        let Some(session) = sqlx::query_as::<_, UserSession>(
            r#"SELECT * FROM user_sessions WHERE user_id = $1 AND test_id = $2"#,
        )
        .bind(user_id)
        .bind(test.id)
        .fetch_optional(&mut *conn)
        .await?
        else {
            return Ok(None);
        };

        let answers = sqlx::query_as::<_, UserAnswer>(
            r#"SELECT * FROM user_answers WHERE session_id = $1 ORDER BY answered_at, id"#,
        )
        .bind(session.id)
        .fetch_all(&mut *conn)
        .await?;

        let result = match session.result_id {
            Some(result_id) => {
                sqlx::query_as::<_, TestResult>(r#"SELECT * FROM results WHERE id = $1"#)
                    .bind(result_id)
                    .fetch_optional(&mut *conn)
                    .await?
            }
            None => None,
        };

        Ok(Some(SessionView {
            session,
            answers,
            result,
        }))
    }

    /// Opens a session, hands back one still in progress, or resets a
    /// completed one when the test allows retakes.
    pub async fn start(&self, user_id: Uuid, slug: &str) -> Result<UserSession> {
        let mut tx = self.pool.begin().await?;
        let test = published_test(&mut tx, slug).await?;

        let existing = sqlx::query_as::<_, UserSession>(
            r#"SELECT * FROM user_sessions WHERE user_id = $1 AND test_id = $2 FOR UPDATE"#,
        )
        .bind(user_id)
        .bind(test.id)
        .fetch_optional(&mut *tx)
        .await?;

        let session = match existing {
            Some(session) if !session.is_completed() => session,
            Some(session) => {
                if !test.allow_retake {
                    return Err(Error::InvalidState(
                        "Test already completed and retakes are not allowed".to_string(),
                    ));
                }
                sqlx::query(r#"DELETE FROM user_answers WHERE session_id = $1"#)
                    .bind(session.id)
                    .execute(&mut *tx)
                    .await?;
                sqlx::query_as::<_, UserSession>(
                    r#"
                    UPDATE user_sessions
                    SET result_id = NULL, score = NULL, max_score = NULL,
                        completed_at = NULL, started_at = NOW(), updated_at = NOW()
                    WHERE id = $1
                    RETURNING *
                    "#,
                )
                .bind(session.id)
                .fetch_one(&mut *tx)
                .await?
            }
            None => {
                // A concurrent start for the same pair lands on the same row.
                sqlx::query_as::<_, UserSession>(
                    r#"
                    INSERT INTO user_sessions (user_id, test_id)
                    VALUES ($1, $2)
                    ON CONFLICT (user_id, test_id) DO UPDATE SET updated_at = NOW()
                    RETURNING *
                    "#,
                )
                .bind(user_id)
                .bind(test.id)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        tx.commit().await?;
        tracing::info!(session_id = %session.id, test_id = %test.id, "Session started");
        Ok(session)
    }

    /// Records the answers, scores them and completes the session in one
    /// transaction.
    pub async fn submit(
        &self,
        user_id: Uuid,
        slug: &str,
        submissions: Vec<Submission>,
    ) -> Result<SubmitResponse> {
        let mut tx = self.pool.begin().await?;
        let test = published_test(&mut tx, slug).await?;

        let session = sqlx::query_as::<_, UserSession>(
            r#"SELECT * FROM user_sessions WHERE user_id = $1 AND test_id = $2 FOR UPDATE"#,
        )
        .bind(user_id)
        .bind(test.id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::InvalidState("Start the test first".to_string()))?;
        if session.is_completed() {
            return Err(Error::InvalidState("Session is already completed".to_string()));
        }

        let graph = TestGraph::load(&mut tx, test).await?;
        check_submissions(&graph, &submissions)?;

        for s in scoring::latest_per_question(&submissions) {
            sqlx::query(
                r#"
                INSERT INTO user_answers (session_id, question_id, answer_id)
                VALUES ($1, $2, $3)
                ON CONFLICT (session_id, question_id) DO UPDATE SET
                    answer_id = EXCLUDED.answer_id,
                    answered_at = NOW()
                "#,
            )
            .bind(session.id)
            .bind(s.question_id)
            .bind(s.answer_id)
            .execute(&mut *tx)
            .await?;
        }

        let outcome = scoring::score(&graph, &submissions);
        let session = sqlx::query_as::<_, UserSession>(
            r#"
            UPDATE user_sessions
            SET result_id = $1, score = $2, max_score = $3,
                completed_at = NOW(), updated_at = NOW()
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(outcome.result_id())
        .bind(outcome.score())
        .bind(outcome.max_score())
        .bind(session.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let result = outcome.result_id().and_then(|id| graph.result(id).cloned());
        tracing::info!(
            session_id = %session.id,
            test_id = %graph.test.id,
            test_type = graph.test.test_type.as_str(),
            result_id = ?outcome.result_id(),
            "Session completed"
        );

        if self.notifier.is_enabled() {
            self.announce(&graph, user_id, &outcome, result.as_ref()).await;
        }

        Ok(SubmitResponse {
            session,
            outcome,
            result,
        })
    }

    async fn announce(
        &self,
        graph: &TestGraph,
        player_id: Uuid,
        outcome: &Outcome,
        result: Option<&TestResult>,
    ) {
        let people = sqlx::query_as::<_, User>(r#"SELECT * FROM users WHERE id = ANY($1)"#)
            .bind(vec![graph.test.owner_id, player_id])
            .fetch_all(&self.pool)
            .await;
        let people = match people {
            Ok(people) => people,
            Err(e) => {
                tracing::warn!(error = %e, "Could not load users for completion notification");
                return;
            }
        };
        let (Some(owner), Some(player)) = (
            people.iter().find(|u| u.id == graph.test.owner_id),
            people.iter().find(|u| u.id == player_id),
        ) else {
            return;
        };

        self.notifier.notify_completion(Completion {
            owner_chat_id: owner.telegram_id,
            test_title: graph.test.title.clone(),
            player_name: player.display_name(),
            result_title: result.map(|r| r.title.clone()),
            score: outcome.score().zip(outcome.max_score()),
        });
    }
}
