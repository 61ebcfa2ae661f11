use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::user::User;
use crate::utils::telegram_auth::TelegramUser;

#[derive(Clone)]
pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the user on first sight and refreshes the profile fields
    /// Telegram reports on every later request.
    pub async fn upsert_telegram_user(&self, tg: &TelegramUser) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (telegram_id, first_name, last_name, username, language_code)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (telegram_id) DO UPDATE SET
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                username = EXCLUDED.username,
                language_code = EXCLUDED.language_code,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(tg.id)
        .bind(&tg.first_name)
        .bind(&tg.last_name)
        .bind(&tg.username)
        .bind(&tg.language_code)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn get(&self, user_id: Uuid) -> Result<User> {
        let user = sqlx::query_as::<_, User>(r#"SELECT * FROM users WHERE id = $1"#)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(user)
    }
}
