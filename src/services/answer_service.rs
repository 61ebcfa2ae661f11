use std::collections::HashSet;

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::dto::{patch_parts, trimmed};
use crate::dto::question_dto::{
    CreateAnswerPayload, PointsInput, ReorderPayload, UpdateAnswerPayload,
};
use crate::error::{Error, Result};
use crate::models::answer::Answer;
use crate::models::graph::{AnswerNode, ResultPoints};
use crate::services::{guard, ordering};

#[derive(Clone)]
pub struct AnswerService {
    pool: PgPool,
}

/// Ids an answer of one question may point at.
struct Targets {
    question_ids: HashSet<Uuid>,
    result_ids: HashSet<Uuid>,
}

impl Targets {
    async fn load(conn: &mut PgConnection, test_id: Uuid) -> Result<Self> {
        let question_ids: Vec<Uuid> =
            sqlx::query_scalar(r#"SELECT id FROM questions WHERE test_id = $1"#)
                .bind(test_id)
                .fetch_all(&mut *conn)
                .await?;
        let result_ids: Vec<Uuid> = sqlx::query_scalar(r#"SELECT id FROM results WHERE test_id = $1"#)
            .bind(test_id)
            .fetch_all(&mut *conn)
            .await?;
        Ok(Self {
            question_ids: question_ids.into_iter().collect(),
            result_ids: result_ids.into_iter().collect(),
        })
    }
}

/// Rejects links that leave the test or loop back onto the owning question.
fn check_links(
    targets: &Targets,
    own_question_id: Uuid,
    next_question_id: Option<Uuid>,
    result_id: Option<Uuid>,
    points: Option<&[PointsInput]>,
) -> Result<()> {
    if let Some(next) = next_question_id {
        if next == own_question_id || !targets.question_ids.contains(&next) {
            return Err(Error::BadRequest(
                "next_question_id must reference another question of this test".to_string(),
            ));
        }
    }
    if let Some(result) = result_id {
        if !targets.result_ids.contains(&result) {
            return Err(Error::BadRequest(
                "result_id must reference a result of this test".to_string(),
            ));
        }
    }
    if let Some(points) = points {
        let mut seen = HashSet::new();
        for p in points {
            if p.points < 0 {
                return Err(Error::BadRequest("Points cannot be negative".to_string()));
            }
            if !targets.result_ids.contains(&p.result_id) {
                return Err(Error::BadRequest(
                    "Points must reference results of this test".to_string(),
                ));
            }
            if !seen.insert(p.result_id) {
                return Err(Error::BadRequest(
                    "Points list a result more than once".to_string(),
                ));
            }
        }
    }
    Ok(())
}

async fn replace_points(
    conn: &mut PgConnection,
    answer_id: Uuid,
    points: &[PointsInput],
) -> Result<Vec<ResultPoints>> {
    sqlx::query(r#"DELETE FROM answer_result_points WHERE answer_id = $1"#)
        .bind(answer_id)
        .execute(&mut *conn)
        .await?;
    for p in points {
        sqlx::query(
            r#"INSERT INTO answer_result_points (answer_id, result_id, points) VALUES ($1, $2, $3)"#,
        )
        .bind(answer_id)
        .bind(p.result_id)
        .bind(p.points)
        .execute(&mut *conn)
        .await?;
    }
    Ok(points
        .iter()
        .map(|p| ResultPoints {
            result_id: p.result_id,
            points: p.points,
        })
        .collect())
}

async fn load_points(conn: &mut PgConnection, answer_id: Uuid) -> Result<Vec<ResultPoints>> {
    let rows = sqlx::query_as::<_, (Uuid, i32)>(
        r#"
        SELECT p.result_id, p.points
        FROM answer_result_points p
        JOIN results r ON r.id = p.result_id
        WHERE p.answer_id = $1
        ORDER BY r.created_at, r.id
        "#,
    )
    .bind(answer_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(result_id, points)| ResultPoints { result_id, points })
        .collect())
}

impl AnswerService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Appends an answer to a question together with its point awards.
    pub async fn create_answer(
        &self,
        owner_id: Uuid,
        question_id: Uuid,
        payload: CreateAnswerPayload,
    ) -> Result<AnswerNode> {
        let mut tx = self.pool.begin().await?;
        let test_id = guard::test_id_of_question(&mut tx, question_id).await?;
        guard::lock_owned_draft(&mut tx, test_id, owner_id).await?;

        let targets = Targets::load(&mut tx, test_id).await?;
        check_links(
            &targets,
            question_id,
            payload.next_question_id,
            payload.result_id,
            Some(&payload.points),
        )?;

        let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM answers WHERE question_id = $1"#)
            .bind(question_id)
            .fetch_one(&mut *tx)
            .await?;

        let answer = sqlx::query_as::<_, Answer>(
            r#"
            INSERT INTO answers
                (question_id, order_index, text, image_url, is_correct, next_question_id, result_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(question_id)
        .bind(count as i32)
        .bind(payload.text.trim())
        .bind(payload.image_url)
        .bind(payload.is_correct)
        .bind(payload.next_question_id)
        .bind(payload.result_id)
        .fetch_one(&mut *tx)
        .await?;

        let points = replace_points(&mut tx, answer.id, &payload.points).await?;

        tx.commit().await?;
        Ok(AnswerNode { answer, points })
    }

    pub async fn update_answer(
        &self,
        owner_id: Uuid,
        answer_id: Uuid,
        payload: UpdateAnswerPayload,
    ) -> Result<AnswerNode> {
        let mut tx = self.pool.begin().await?;
        let (test_id, question_id) = guard::parents_of_answer(&mut tx, answer_id).await?;
        guard::lock_owned_draft(&mut tx, test_id, owner_id).await?;

        let targets = Targets::load(&mut tx, test_id).await?;
        check_links(
            &targets,
            question_id,
            payload.next_question_id.flatten(),
            payload.result_id.flatten(),
            payload.points.as_deref(),
        )?;

        let (set_image, image_url) = patch_parts(payload.image_url);
        let (set_next, next_question_id) = patch_parts(payload.next_question_id);
        let (set_result, result_id) = patch_parts(payload.result_id);

        let answer = sqlx::query_as::<_, Answer>(
            r#"
            UPDATE answers
            SET
                text = COALESCE($1, text),
                image_url = CASE WHEN $2 THEN $3 ELSE image_url END,
                is_correct = COALESCE($4, is_correct),
                next_question_id = CASE WHEN $5 THEN $6 ELSE next_question_id END,
                result_id = CASE WHEN $7 THEN $8 ELSE result_id END,
                updated_at = NOW()
            WHERE id = $9
            RETURNING *
            "#,
        )
        .bind(trimmed(payload.text.as_deref()))
        .bind(set_image)
        .bind(image_url)
        .bind(payload.is_correct)
        .bind(set_next)
        .bind(next_question_id)
        .bind(set_result)
        .bind(result_id)
        .bind(answer_id)
        .fetch_one(&mut *tx)
        .await?;

        let points = match payload.points {
            Some(points) => replace_points(&mut tx, answer_id, &points).await?,
            None => load_points(&mut tx, answer_id).await?,
        };

        tx.commit().await?;
        Ok(AnswerNode { answer, points })
    }

    pub async fn delete_answer(&self, owner_id: Uuid, answer_id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let (test_id, question_id) = guard::parents_of_answer(&mut tx, answer_id).await?;
        guard::lock_owned_draft(&mut tx, test_id, owner_id).await?;

        let removed: i32 =
            sqlx::query_scalar(r#"DELETE FROM answers WHERE id = $1 RETURNING order_index"#)
                .bind(answer_id)
                .fetch_one(&mut *tx)
                .await?;
        ordering::repack_answers(&mut tx, question_id, removed).await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn reorder_answers(
        &self,
        owner_id: Uuid,
        question_id: Uuid,
        payload: ReorderPayload,
    ) -> Result<Vec<Answer>> {
        let mut tx = self.pool.begin().await?;
        let test_id = guard::test_id_of_question(&mut tx, question_id).await?;
        guard::lock_owned_draft(&mut tx, test_id, owner_id).await?;

        let existing: Vec<Uuid> =
            sqlx::query_scalar(r#"SELECT id FROM answers WHERE question_id = $1"#)
                .bind(question_id)
                .fetch_all(&mut *tx)
                .await?;
        ordering::ensure_permutation(&existing, &payload.ids)?;

        for (idx, id) in payload.ids.iter().enumerate() {
            sqlx::query(r#"UPDATE answers SET order_index = $1, updated_at = NOW() WHERE id = $2"#)
                .bind(idx as i32)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        let answers = sqlx::query_as::<_, Answer>(
            r#"SELECT * FROM answers WHERE question_id = $1 ORDER BY order_index"#,
        )
        .bind(question_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(answers)
    }
}
