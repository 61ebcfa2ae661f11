//! Dense `order_index` maintenance for questions and answers.

use std::collections::HashSet;

use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Checks that `requested` names every id in `existing` exactly once.
pub fn ensure_permutation(existing: &[Uuid], requested: &[Uuid]) -> Result<()> {
    let wanted: HashSet<&Uuid> = requested.iter().collect();
    if wanted.len() != requested.len() {
        return Err(Error::BadRequest("Order contains duplicate ids".to_string()));
    }
    let have: HashSet<&Uuid> = existing.iter().collect();
    if have != wanted {
        return Err(Error::BadRequest(
            "Order must list every item of the parent exactly once".to_string(),
        ));
    }
    Ok(())
}

/// Closes the gap left by a deleted question.
pub async fn repack_questions(conn: &mut PgConnection, test_id: Uuid, removed: i32) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE questions SET order_index = order_index - 1, updated_at = NOW()
        WHERE test_id = $1 AND order_index > $2
        "#,
    )
    .bind(test_id)
    .bind(removed)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Closes the gap left by a deleted answer.
pub async fn repack_answers(conn: &mut PgConnection, question_id: Uuid, removed: i32) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE answers SET order_index = order_index - 1, updated_at = NOW()
        WHERE question_id = $1 AND order_index > $2
        "#,
    )
    .bind(question_id)
    .bind(removed)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
