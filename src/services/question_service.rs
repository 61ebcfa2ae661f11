use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::{patch_parts, trimmed};
use crate::dto::question_dto::{CreateQuestionPayload, ReorderPayload, UpdateQuestionPayload};
use crate::error::{Error, Result};
use crate::models::question::Question;
use crate::services::{guard, ordering};

#[derive(Clone)]
pub struct QuestionService {
    pool: PgPool,
    max_questions_per_test: i64,
}

impl QuestionService {
    pub fn new(pool: PgPool, max_questions_per_test: i64) -> Self {
        Self {
            pool,
            max_questions_per_test,
        }
    }

    /// Appends a question at the end of the test.
    pub async fn create_question(
        &self,
        owner_id: Uuid,
        test_id: Uuid,
        payload: CreateQuestionPayload,
    ) -> Result<Question> {
        let mut tx = self.pool.begin().await?;
        guard::lock_owned_draft(&mut tx, test_id, owner_id).await?;

        let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM questions WHERE test_id = $1"#)
            .bind(test_id)
            .fetch_one(&mut *tx)
            .await?;
        if count >= self.max_questions_per_test {
            return Err(Error::LimitExceeded(format!(
                "A test can have at most {} questions",
                self.max_questions_per_test
            )));
        }

        let question = sqlx::query_as::<_, Question>(
            r#"
            INSERT INTO questions (test_id, order_index, text, image_url)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(test_id)
        .bind(count as i32)
        .bind(payload.text.trim())
        .bind(payload.image_url)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(question)
    }

    pub async fn update_question(
        &self,
        owner_id: Uuid,
        question_id: Uuid,
        payload: UpdateQuestionPayload,
    ) -> Result<Question> {
        let mut tx = self.pool.begin().await?;
        let test_id = guard::test_id_of_question(&mut tx, question_id).await?;
        guard::lock_owned_draft(&mut tx, test_id, owner_id).await?;

        let (set_image, image_url) = patch_parts(payload.image_url);

        let question = sqlx::query_as::<_, Question>(
            r#"
            UPDATE questions
            SET
                text = COALESCE($1, text),
                image_url = CASE WHEN $2 THEN $3 ELSE image_url END,
                updated_at = NOW()
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(trimmed(payload.text.as_deref()))
        .bind(set_image)
        .bind(image_url)
        .bind(question_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(question)
    }

    /// Deletes a question and re-packs the remaining order in the same
    /// transaction.
    pub async fn delete_question(&self, owner_id: Uuid, question_id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let test_id = guard::test_id_of_question(&mut tx, question_id).await?;
        guard::lock_owned_draft(&mut tx, test_id, owner_id).await?;

        let removed: i32 =
            sqlx::query_scalar(r#"DELETE FROM questions WHERE id = $1 RETURNING order_index"#)
                .bind(question_id)
                .fetch_one(&mut *tx)
                .await?;
        ordering::repack_questions(&mut tx, test_id, removed).await?;

        tx.commit().await?;
        tracing::debug!(question_id = %question_id, test_id = %test_id, "Question deleted");
        Ok(())
    }

    pub async fn reorder_questions(
        &self,
        owner_id: Uuid,
        test_id: Uuid,
        payload: ReorderPayload,
    ) -> Result<Vec<Question>> {
        let mut tx = self.pool.begin().await?;
        guard::lock_owned_draft(&mut tx, test_id, owner_id).await?;

        let existing: Vec<Uuid> =
            sqlx::query_scalar(r#"SELECT id FROM questions WHERE test_id = $1"#)
                .bind(test_id)
                .fetch_all(&mut *tx)
                .await?;
        ordering::ensure_permutation(&existing, &payload.ids)?;

        for (idx, id) in payload.ids.iter().enumerate() {
            sqlx::query(
                r#"UPDATE questions SET order_index = $1, updated_at = NOW() WHERE id = $2"#,
            )
            .bind(idx as i32)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        let questions = sqlx::query_as::<_, Question>(
            r#"SELECT * FROM questions WHERE test_id = $1 ORDER BY order_index"#,
        )
        .bind(test_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(questions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::test_dto::CreateTestPayload;
    use crate::models::test::TestType;
    use crate::services::test_service::TestService;
    use crate::test_support;
    use crate::utils::slug::RandomSlugGenerator;
    use std::sync::Arc;

    fn question(text: &str) -> CreateQuestionPayload {
        CreateQuestionPayload {
            text: text.to_string(),
            image_url: None,
        }
    }

    #[tokio::test]
    async fn delete_repacks_and_reorder_is_atomic() {
        let Some(pool) = test_support::pool().await else {
            return;
        };
        let owner = test_support::seed_user(&pool).await;
        let tests = TestService::new(pool.clone(), Arc::new(RandomSlugGenerator), 10);
        let test = tests
            .create_test(
                owner,
                CreateTestPayload {
                    title: "Ordering".into(),
                    description: None,
                    test_type: TestType::Quiz,
                    allow_retake: false,
                },
            )
            .await
            .unwrap();

        let service = QuestionService::new(pool.clone(), 4);
        let mut ids = Vec::new();
        for text in ["a", "b", "c", "d"] {
            ids.push(service.create_question(owner, test.id, question(text)).await.unwrap().id);
        }
        let err = service
            .create_question(owner, test.id, question("e"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::LimitExceeded(_)));

        service.delete_question(owner, ids[1]).await.unwrap();
        let graph = tests.get_graph(owner, test.id).await.unwrap();
        let orders: Vec<i32> = graph.questions.iter().map(|q| q.question.order_index).collect();
        assert_eq!(orders, vec![0, 1, 2]);
        let texts: Vec<&str> = graph.questions.iter().map(|q| q.question.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "c", "d"]);

        let err = service
            .reorder_questions(owner, test.id, ReorderPayload { ids: vec![ids[3], ids[0]] })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));

        let reordered = service
            .reorder_questions(
                owner,
                test.id,
                ReorderPayload {
                    ids: vec![ids[3], ids[0], ids[2]],
                },
            )
            .await
            .unwrap();
        let texts: Vec<&str> = reordered.iter().map(|q| q.text.as_str()).collect();
        assert_eq!(texts, vec!["d", "a", "c"]);

        let renamed = service
            .update_question(
                owner,
                ids[0],
                UpdateQuestionPayload {
                    text: Some("  a, padded \n".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.text, "a, padded");

        let stranger = test_support::seed_user(&pool).await;
        let err = service.delete_question(stranger, ids[0]).await.unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }
}
