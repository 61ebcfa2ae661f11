//! Database helpers for service tests. Tests that need Postgres call
//! `pool()` and return early when `DATABASE_URL` is unset.

use rand::Rng;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

pub async fn pool() -> Option<PgPool> {
    dotenvy::dotenv().ok();
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("skipping database-backed test: DATABASE_URL is not set");
        return None;
    };
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("DATABASE_URL is set but Postgres is unreachable");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations failed");
    Some(pool)
}

pub fn random_telegram_id() -> i64 {
    rand::thread_rng().gen_range(1_000_000_000..i64::MAX / 2)
}

pub async fn seed_user(pool: &PgPool) -> Uuid {
    sqlx::query_scalar(
        r#"INSERT INTO users (telegram_id, first_name, username) VALUES ($1, 'Test', 'tester') RETURNING id"#,
    )
    .bind(random_telegram_id())
    .fetch_one(pool)
    .await
    .expect("seed user")
}
