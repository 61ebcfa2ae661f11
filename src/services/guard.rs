//! Ownership and lifecycle checks shared by every owner-side write.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::test::Test;

pub fn ensure_owner(test: &Test, owner_id: Uuid) -> Result<()> {
    if test.owner_id != owner_id {
        return Err(Error::Forbidden("You do not own this test".to_string()));
    }
    Ok(())
}

pub fn ensure_draft(test: &Test) -> Result<()> {
    if test.is_published() {
        return Err(Error::InvalidState(
            "Published tests cannot be modified".to_string(),
        ));
    }
    Ok(())
}

pub async fn find_test(conn: &mut PgConnection, test_id: Uuid) -> Result<Test> {
    sqlx::query_as::<_, Test>(r#"SELECT * FROM tests WHERE id = $1"#)
        .bind(test_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::NotFound("Test not found".to_string()))
}

pub async fn owned_test(conn: &mut PgConnection, test_id: Uuid, owner_id: Uuid) -> Result<Test> {
    let test = find_test(conn, test_id).await?;
    ensure_owner(&test, owner_id)?;
    Ok(test)
}

/// Locks the test row for the rest of the surrounding transaction, then
/// checks ownership and draft state. Every structural write goes through
/// here so order assignment, re-packing and publishing serialize per test.
pub async fn lock_owned_draft(
    conn: &mut PgConnection,
    test_id: Uuid,
    owner_id: Uuid,
) -> Result<Test> {
    let test = sqlx::query_as::<_, Test>(r#"SELECT * FROM tests WHERE id = $1 FOR UPDATE"#)
        .bind(test_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::NotFound("Test not found".to_string()))?;
    ensure_owner(&test, owner_id)?;
    ensure_draft(&test)?;
    Ok(test)
}

pub async fn test_id_of_question(conn: &mut PgConnection, question_id: Uuid) -> Result<Uuid> {
    sqlx::query_scalar::<_, Uuid>(r#"SELECT test_id FROM questions WHERE id = $1"#)
        .bind(question_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::NotFound("Question not found".to_string()))
}

/// Returns `(test_id, question_id)` for an answer.
pub async fn parents_of_answer(conn: &mut PgConnection, answer_id: Uuid) -> Result<(Uuid, Uuid)> {
    sqlx::query_as::<_, (Uuid, Uuid)>(
        r#"
        SELECT q.test_id, q.id
        FROM answers a
        JOIN questions q ON q.id = a.question_id
        WHERE a.id = $1
        "#,
    )
    .bind(answer_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| Error::NotFound("Answer not found".to_string()))
}

pub async fn test_id_of_result(conn: &mut PgConnection, result_id: Uuid) -> Result<Uuid> {
    sqlx::query_scalar::<_, Uuid>(r#"SELECT test_id FROM results WHERE id = $1"#)
        .bind(result_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::NotFound("Result not found".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::graph::fixtures;
    use crate::models::test::{TestStatus, TestType};

    #[test]
    fn owner_passes_and_stranger_is_forbidden() {
        let test = fixtures::test(TestType::Quiz);
        assert!(ensure_owner(&test, test.owner_id).is_ok());
        assert!(matches!(
            ensure_owner(&test, Uuid::new_v4()),
            Err(Error::Forbidden(_))
        ));
    }

    #[test]
    fn published_tests_are_not_drafts() {
        let mut test = fixtures::test(TestType::Branching);
        assert!(ensure_draft(&test).is_ok());
        test.status = TestStatus::Published;
        assert!(matches!(ensure_draft(&test), Err(Error::InvalidState(_))));
    }
}
