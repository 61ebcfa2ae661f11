use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::{patch_parts, trimmed};
use crate::dto::result_dto::{CreateResultPayload, UpdateResultPayload};
use crate::error::{Error, Result};
use crate::models::test_result::TestResult;
use crate::services::guard;

#[derive(Clone)]
pub struct ResultService {
    pool: PgPool,
}

impl ResultService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_result(
        &self,
        owner_id: Uuid,
        test_id: Uuid,
        payload: CreateResultPayload,
    ) -> Result<TestResult> {
        let mut tx = self.pool.begin().await?;
        guard::lock_owned_draft(&mut tx, test_id, owner_id).await?;

        let result = sqlx::query_as::<_, TestResult>(
            r#"
            INSERT INTO results (test_id, title, description, image_url)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(test_id)
        .bind(payload.title.trim())
        .bind(payload.description)
        .bind(payload.image_url)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result)
    }

    pub async fn list_results(&self, owner_id: Uuid, test_id: Uuid) -> Result<Vec<TestResult>> {
        let mut conn = self.pool.acquire().await?;
        guard::owned_test(&mut conn, test_id, owner_id).await?;
        let results = sqlx::query_as::<_, TestResult>(
            r#"SELECT * FROM results WHERE test_id = $1 ORDER BY created_at, id"#,
        )
        .bind(test_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(results)
    }

    pub async fn update_result(
        &self,
        owner_id: Uuid,
        result_id: Uuid,
        payload: UpdateResultPayload,
    ) -> Result<TestResult> {
        let mut tx = self.pool.begin().await?;
        let test_id = guard::test_id_of_result(&mut tx, result_id).await?;
        guard::lock_owned_draft(&mut tx, test_id, owner_id).await?;

        let (set_description, description) = patch_parts(payload.description);
        let (set_image, image_url) = patch_parts(payload.image_url);

        let result = sqlx::query_as::<_, TestResult>(
            r#"
            UPDATE results
            SET
                title = COALESCE($1, title),
                description = CASE WHEN $2 THEN $3 ELSE description END,
                image_url = CASE WHEN $4 THEN $5 ELSE image_url END,
                updated_at = NOW()
            WHERE id = $6
            RETURNING *
            "#,
        )
        .bind(trimmed(payload.title.as_deref()))
        .bind(set_description)
        .bind(description)
        .bind(set_image)
        .bind(image_url)
        .bind(result_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result)
    }

    /// Refuses while any answer still routes to or awards points to the
    /// result.
    pub async fn delete_result(&self, owner_id: Uuid, result_id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let test_id = guard::test_id_of_result(&mut tx, result_id).await?;
        guard::lock_owned_draft(&mut tx, test_id, owner_id).await?;

        let references: i64 = sqlx::query_scalar(
            r#"
            SELECT
                (SELECT COUNT(*) FROM answers WHERE result_id = $1)
                + (SELECT COUNT(*) FROM answer_result_points WHERE result_id = $1)
            "#,
        )
        .bind(result_id)
        .fetch_one(&mut *tx)
        .await?;
        if references > 0 {
            return Err(Error::Conflict(format!(
                "Result is still referenced by {} answer link(s)",
                references
            )));
        }

        sqlx::query(r#"DELETE FROM results WHERE id = $1"#)
            .bind(result_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
