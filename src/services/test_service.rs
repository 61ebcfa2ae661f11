use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::{patch_parts, trimmed};
use crate::dto::test_dto::{
    CreateTestPayload, ListTestsQuery, PaginatedTests, UpdateTestPayload,
    UpsertWelcomeScreenPayload,
};
use crate::error::{Error, Result};
use crate::models::graph::TestGraph;
use crate::models::test::Test;
use crate::models::welcome_screen::WelcomeScreen;
use crate::services::guard;
use crate::services::publish_validator::validate_for_publish;
use crate::utils::slug::SlugGenerator;

pub const SLUG_LENGTH: usize = 10;
pub const SLUG_ATTEMPTS: usize = 5;

#[derive(Clone)]
pub struct TestService {
    pool: PgPool,
    slugs: Arc<dyn SlugGenerator>,
    max_tests_per_user: i64,
}

impl TestService {
    pub fn new(pool: PgPool, slugs: Arc<dyn SlugGenerator>, max_tests_per_user: i64) -> Self {
        Self {
            pool,
            slugs,
            max_tests_per_user,
        }
    }

    pub async fn create_test(&self, owner_id: Uuid, payload: CreateTestPayload) -> Result<Test> {
        let mut tx = self.pool.begin().await?;

        // Serializes concurrent creates of one owner so the quota holds.
        sqlx::query(r#"SELECT id FROM users WHERE id = $1 FOR UPDATE"#)
            .bind(owner_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".to_string()))?;

        let owned: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM tests WHERE owner_id = $1"#)
            .bind(owner_id)
            .fetch_one(&mut *tx)
            .await?;
        if owned >= self.max_tests_per_user {
            return Err(Error::LimitExceeded(format!(
                "A user can own at most {} tests",
                self.max_tests_per_user
            )));
        }

        let test = sqlx::query_as::<_, Test>(
            r#"
            INSERT INTO tests (owner_id, title, description, test_type, allow_retake)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(owner_id)
        .bind(payload.title.trim())
        .bind(payload.description)
        .bind(payload.test_type)
        .bind(payload.allow_retake)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(r#"INSERT INTO welcome_screens (test_id, title) VALUES ($1, $2)"#)
            .bind(test.id)
            .bind(&test.title)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(test_id = %test.id, owner_id = %owner_id, test_type = test.test_type.as_str(), "Test created");
        Ok(test)
    }

    pub async fn list_tests(&self, owner_id: Uuid, query: ListTestsQuery) -> Result<PaginatedTests> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM tests
            WHERE owner_id = $1 AND ($2::test_status IS NULL OR status = $2)
            "#,
        )
        .bind(owner_id)
        .bind(query.status)
        .fetch_one(&self.pool)
        .await?;

        let tests = sqlx::query_as::<_, Test>(
            r#"
            SELECT * FROM tests
            WHERE owner_id = $1 AND ($2::test_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(owner_id)
        .bind(query.status)
        .bind(per_page)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total_pages = ((total as f64) / (per_page as f64)).ceil() as i64;

        Ok(PaginatedTests {
            tests,
            total,
            page,
            per_page,
            total_pages,
        })
    }

    pub async fn get_test(&self, owner_id: Uuid, test_id: Uuid) -> Result<Test> {
        let mut conn = self.pool.acquire().await?;
        guard::owned_test(&mut conn, test_id, owner_id).await
    }

    /// Full owner view, including correctness, routing and points.
    pub async fn get_graph(&self, owner_id: Uuid, test_id: Uuid) -> Result<TestGraph> {
        let mut conn = self.pool.acquire().await?;
        let test = guard::owned_test(&mut conn, test_id, owner_id).await?;
        TestGraph::load(&mut conn, test).await
    }

    pub async fn update_test(
        &self,
        owner_id: Uuid,
        test_id: Uuid,
        payload: UpdateTestPayload,
    ) -> Result<Test> {
        let mut tx = self.pool.begin().await?;
        guard::lock_owned_draft(&mut tx, test_id, owner_id).await?;

        let (set_description, description) = patch_parts(payload.description);

        let test = sqlx::query_as::<_, Test>(
            r#"
            UPDATE tests
            SET
                title = COALESCE($1, title),
                description = CASE WHEN $2 THEN $3 ELSE description END,
                allow_retake = COALESCE($4, allow_retake),
                updated_at = NOW()
            WHERE id = $5
            RETURNING *
            "#,
        )
        .bind(trimmed(payload.title.as_deref()))
        .bind(set_description)
        .bind(description)
        .bind(payload.allow_retake)
        .bind(test_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(test)
    }

    /// Deletes a test with everything under it, sessions included. Allowed in
    /// any lifecycle state.
    pub async fn delete_test(&self, owner_id: Uuid, test_id: Uuid) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        guard::owned_test(&mut conn, test_id, owner_id).await?;
        sqlx::query(r#"DELETE FROM tests WHERE id = $1"#)
            .bind(test_id)
            .execute(&mut *conn)
            .await?;
        tracing::info!(test_id = %test_id, "Test deleted");
        Ok(())
    }

    pub async fn upsert_welcome_screen(
        &self,
        owner_id: Uuid,
        test_id: Uuid,
        payload: UpsertWelcomeScreenPayload,
    ) -> Result<WelcomeScreen> {
        let mut tx = self.pool.begin().await?;
        guard::lock_owned_draft(&mut tx, test_id, owner_id).await?;

        let screen = sqlx::query_as::<_, WelcomeScreen>(
            r#"
            INSERT INTO welcome_screens (test_id, title, description, image_url, button_text)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (test_id) DO UPDATE SET
                title = EXCLUDED.title,
                description = EXCLUDED.description,
                image_url = EXCLUDED.image_url,
                button_text = EXCLUDED.button_text,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(test_id)
        .bind(payload.title.trim())
        .bind(payload.description)
        .bind(payload.image_url)
        .bind(payload.button_text)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(screen)
    }

    /// Validates the draft and freezes it under a fresh public slug.
    pub async fn publish(&self, owner_id: Uuid, test_id: Uuid) -> Result<Test> {
        let mut tx = self.pool.begin().await?;

        let test = sqlx::query_as::<_, Test>(r#"SELECT * FROM tests WHERE id = $1 FOR UPDATE"#)
            .bind(test_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::NotFound("Test not found".to_string()))?;
        guard::ensure_owner(&test, owner_id)?;
        if test.is_published() {
            return Err(Error::InvalidState("Test is already published".to_string()));
        }

        let graph = TestGraph::load(&mut tx, test).await?;
        let issues = validate_for_publish(&graph);
        if !issues.is_empty() {
            return Err(Error::Validation(issues));
        }

        let mut published = None;
        for attempt in 1..=SLUG_ATTEMPTS {
            let slug = self.slugs.generate(SLUG_LENGTH);
            let mut savepoint = sqlx::Connection::begin(&mut *tx).await?;
            let outcome = sqlx::query_as::<_, Test>(
                r#"
                UPDATE tests
                SET status = 'published', slug = $1, published_at = NOW(), updated_at = NOW()
                WHERE id = $2
                RETURNING *
                "#,
            )
            .bind(&slug)
            .bind(test_id)
            .fetch_one(&mut *savepoint)
            .await;

            match outcome {
                Ok(test) => {
                    savepoint.commit().await?;
                    published = Some(test);
                    break;
                }
                Err(err) if is_unique_violation(&err) => {
                    savepoint.rollback().await?;
                    tracing::warn!(test_id = %test_id, attempt, "Slug collision, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }

        let test = published.ok_or_else(|| {
            Error::Internal(format!(
                "Could not allocate a unique slug after {} attempts",
                SLUG_ATTEMPTS
            ))
        })?;
        tx.commit().await?;

        tracing::info!(test_id = %test.id, slug = ?test.slug, "Test published");
        Ok(test)
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some("23505"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::question_dto::{
        CreateAnswerPayload, CreateQuestionPayload, PointsInput, ReorderPayload,
        UpdateAnswerPayload, UpdateQuestionPayload,
    };
    use crate::dto::result_dto::{CreateResultPayload, UpdateResultPayload};
    use crate::models::test::{TestStatus, TestType};
    use crate::services::answer_service::AnswerService;
    use crate::services::notification_service::NotificationService;
    use crate::services::question_service::QuestionService;
    use crate::services::result_service::ResultService;
    use crate::services::scoring::Submission;
    use crate::services::session_service::SessionService;
    use crate::test_support;
    use crate::utils::slug::{MockSlugGenerator, RandomSlugGenerator};
    use reqwest::Client;

    fn quiz_payload(title: &str) -> CreateTestPayload {
        CreateTestPayload {
            title: title.to_string(),
            description: None,
            test_type: TestType::Quiz,
            allow_retake: false,
        }
    }

    async fn publishable_quiz(pool: &PgPool, service: &TestService, owner: Uuid) -> Test {
        let test = service.create_test(owner, quiz_payload("Capitals")).await.unwrap();
        let questions = QuestionService::new(pool.clone(), 100);
        let answers = AnswerService::new(pool.clone());
        let q = questions
            .create_question(
                owner,
                test.id,
                CreateQuestionPayload {
                    text: "Capital of France?".into(),
                    image_url: None,
                },
            )
            .await
            .unwrap();
        for (text, correct) in [("Paris", true), ("Rome", false)] {
            answers
                .create_answer(
                    owner,
                    q.id,
                    CreateAnswerPayload {
                        text: text.into(),
                        image_url: None,
                        is_correct: correct,
                        next_question_id: None,
                        result_id: None,
                        points: Vec::new(),
                    },
                )
                .await
                .unwrap();
        }
        test
    }

    fn typed_payload(title: &str, test_type: TestType) -> CreateTestPayload {
        CreateTestPayload {
            title: title.to_string(),
            description: None,
            test_type,
            allow_retake: false,
        }
    }

    fn result_payload(title: &str) -> CreateResultPayload {
        CreateResultPayload {
            title: title.to_string(),
            description: None,
            image_url: None,
        }
    }

    fn answer_payload(text: &str) -> CreateAnswerPayload {
        CreateAnswerPayload {
            text: text.to_string(),
            image_url: None,
            is_correct: false,
            next_question_id: None,
            result_id: None,
            points: Vec::new(),
        }
    }

    fn assert_invalid_state<T: std::fmt::Debug>(outcome: Result<T>) {
        match outcome {
            Err(Error::InvalidState(_)) => {}
            other => panic!("expected invalid state, got {:?}", other),
        }
    }

    #[test]
    fn non_database_errors_are_not_unique_violations() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }

    #[tokio::test]
    async fn quota_and_publish_lifecycle() {
        let Some(pool) = test_support::pool().await else {
            return;
        };
        let owner = test_support::seed_user(&pool).await;
        let service = TestService::new(pool.clone(), Arc::new(RandomSlugGenerator), 2);

        let test = publishable_quiz(&pool, &service, owner).await;
        service.create_test(owner, quiz_payload("Second")).await.unwrap();
        let err = service.create_test(owner, quiz_payload("Third")).await.unwrap_err();
        assert!(matches!(err, Error::LimitExceeded(_)));

        let stranger = test_support::seed_user(&pool).await;
        let err = service.publish(stranger, test.id).await.unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));

        let published = service.publish(owner, test.id).await.unwrap();
        assert_eq!(published.status, TestStatus::Published);
        assert_eq!(published.slug.as_ref().map(|s| s.len()), Some(SLUG_LENGTH));
        assert!(published.published_at.is_some());

        let err = service.publish(owner, test.id).await.unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));

        let err = service
            .update_test(owner, test.id, UpdateTestPayload::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));

        service.delete_test(owner, test.id).await.unwrap();
    }

    #[tokio::test]
    async fn publish_with_issues_is_rejected() {
        let Some(pool) = test_support::pool().await else {
            return;
        };
        let owner = test_support::seed_user(&pool).await;
        let service = TestService::new(pool.clone(), Arc::new(RandomSlugGenerator), 10);
        let test = service.create_test(owner, quiz_payload("Empty")).await.unwrap();

        match service.publish(owner, test.id).await {
            Err(Error::Validation(issues)) => {
                assert!(issues.iter().any(|i| i.field == "questions"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn publish_gives_up_after_repeated_slug_collisions() {
        let Some(pool) = test_support::pool().await else {
            return;
        };
        let owner = test_support::seed_user(&pool).await;
        let taken = format!("t{}", &Uuid::new_v4().simple().to_string()[..9]);

        let mut first = MockSlugGenerator::new();
        let slug = taken.clone();
        first
            .expect_generate()
            .withf(|len| *len == SLUG_LENGTH)
            .times(1)
            .returning(move |_| slug.clone());
        let service = TestService::new(pool.clone(), Arc::new(first), 10);
        let a = publishable_quiz(&pool, &service, owner).await;
        service.publish(owner, a.id).await.unwrap();

        let mut colliding = MockSlugGenerator::new();
        let slug = taken.clone();
        colliding
            .expect_generate()
            .times(SLUG_ATTEMPTS)
            .returning(move |_| slug.clone());
        let service = TestService::new(pool.clone(), Arc::new(colliding), 10);
        let b = publishable_quiz(&pool, &service, owner).await;
        let err = service.publish(owner, b.id).await.unwrap_err();
        assert!(matches!(err, Error::Internal(_)));

        let still_draft = service.get_graph(owner, b.id).await.unwrap();
        assert_eq!(still_draft.test.status, TestStatus::Draft);
    }

    #[tokio::test]
    async fn published_tests_reject_every_structural_write() {
        let Some(pool) = test_support::pool().await else {
            return;
        };
        let owner = test_support::seed_user(&pool).await;
        let service = TestService::new(pool.clone(), Arc::new(RandomSlugGenerator), 10);
        let results = ResultService::new(pool.clone());
        let questions = QuestionService::new(pool.clone(), 100);
        let answers = AnswerService::new(pool.clone());

        let test = publishable_quiz(&pool, &service, owner).await;
        let extra = results
            .create_result(owner, test.id, result_payload("Bonus"))
            .await
            .unwrap();
        service.publish(owner, test.id).await.unwrap();

        let graph = service.get_graph(owner, test.id).await.unwrap();
        let question = &graph.questions[0];
        let question_id = question.question.id;
        let answer_ids: Vec<Uuid> = question.answers.iter().map(|a| a.answer.id).collect();

        assert_invalid_state(
            service
                .upsert_welcome_screen(
                    owner,
                    test.id,
                    UpsertWelcomeScreenPayload {
                        title: "Hello".into(),
                        description: None,
                        image_url: None,
                        button_text: None,
                    },
                )
                .await,
        );
        assert_invalid_state(
            questions
                .create_question(
                    owner,
                    test.id,
                    CreateQuestionPayload {
                        text: "Late addition".into(),
                        image_url: None,
                    },
                )
                .await,
        );
        assert_invalid_state(
            questions
                .update_question(
                    owner,
                    question_id,
                    UpdateQuestionPayload {
                        text: Some("Changed".into()),
                        ..Default::default()
                    },
                )
                .await,
        );
        assert_invalid_state(
            questions
                .reorder_questions(owner, test.id, ReorderPayload { ids: vec![question_id] })
                .await,
        );
        assert_invalid_state(questions.delete_question(owner, question_id).await);

        assert_invalid_state(
            answers
                .create_answer(owner, question_id, answer_payload("Berlin"))
                .await,
        );
        assert_invalid_state(
            answers
                .update_answer(
                    owner,
                    answer_ids[1],
                    UpdateAnswerPayload {
                        is_correct: Some(true),
                        ..Default::default()
                    },
                )
                .await,
        );
        let reversed: Vec<Uuid> = answer_ids.iter().rev().copied().collect();
        assert_invalid_state(
            answers
                .reorder_answers(owner, question_id, ReorderPayload { ids: reversed })
                .await,
        );
        assert_invalid_state(answers.delete_answer(owner, answer_ids[1]).await);

        assert_invalid_state(
            results
                .create_result(owner, test.id, result_payload("Another"))
                .await,
        );
        assert_invalid_state(
            results
                .update_result(
                    owner,
                    extra.id,
                    UpdateResultPayload {
                        title: Some("Renamed".into()),
                        ..Default::default()
                    },
                )
                .await,
        );
        assert_invalid_state(results.delete_result(owner, extra.id).await);

        let unchanged = service.get_graph(owner, test.id).await.unwrap();
        assert_eq!(unchanged.questions.len(), 1);
        assert_eq!(unchanged.questions[0].answers.len(), 2);
        assert_eq!(unchanged.results.len(), 1);
    }

    #[tokio::test]
    async fn deletes_tests_whose_answers_reference_results() {
        let Some(pool) = test_support::pool().await else {
            return;
        };
        let owner = test_support::seed_user(&pool).await;
        let player = test_support::seed_user(&pool).await;
        let service = TestService::new(pool.clone(), Arc::new(RandomSlugGenerator), 10);
        let results = ResultService::new(pool.clone());
        let questions = QuestionService::new(pool.clone(), 100);
        let answers = AnswerService::new(pool.clone());

        // Published personality test with points, a finished session and
        // recorded answers.
        let personality = service
            .create_test(owner, typed_payload("Seasons", TestType::Personality))
            .await
            .unwrap();
        let summer = results
            .create_result(owner, personality.id, result_payload("Summer"))
            .await
            .unwrap();
        let q = questions
            .create_question(
                owner,
                personality.id,
                CreateQuestionPayload {
                    text: "Favourite drink?".into(),
                    image_url: None,
                },
            )
            .await
            .unwrap();
        let mut answer_ids = Vec::new();
        for text in ["Lemonade", "Iced tea"] {
            let node = answers
                .create_answer(
                    owner,
                    q.id,
                    CreateAnswerPayload {
                        points: vec![PointsInput {
                            result_id: summer.id,
                            points: 1,
                        }],
                        ..answer_payload(text)
                    },
                )
                .await
                .unwrap();
            answer_ids.push(node.answer.id);
        }
        let slug = service.publish(owner, personality.id).await.unwrap().slug.unwrap();
        let sessions = SessionService::new(
            pool.clone(),
            NotificationService::new(Client::new(), "token".into(), false),
        );
        sessions.start(player, &slug).await.unwrap();
        let done = sessions
            .submit(player, &slug, vec![Submission::new(q.id, answer_ids[0])])
            .await
            .unwrap();
        assert_eq!(done.session.result_id, Some(summer.id));

        service.delete_test(owner, personality.id).await.unwrap();
        assert!(matches!(
            service.get_graph(owner, personality.id).await,
            Err(Error::NotFound(_))
        ));

        // Draft branching test whose answer ends on a result.
        let branching = service
            .create_test(owner, typed_payload("Forest path", TestType::Branching))
            .await
            .unwrap();
        let exit = results
            .create_result(owner, branching.id, result_payload("You escape"))
            .await
            .unwrap();
        let q = questions
            .create_question(
                owner,
                branching.id,
                CreateQuestionPayload {
                    text: "Left or right?".into(),
                    image_url: None,
                },
            )
            .await
            .unwrap();
        answers
            .create_answer(
                owner,
                q.id,
                CreateAnswerPayload {
                    result_id: Some(exit.id),
                    ..answer_payload("Left")
                },
            )
            .await
            .unwrap();

        service.delete_test(owner, branching.id).await.unwrap();
        assert!(matches!(
            service.get_graph(owner, branching.id).await,
            Err(Error::NotFound(_))
        ));
    }
}
