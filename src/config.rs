use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub telegram_bot_token: String,
    pub webapp_url: Option<String>,
    /// Maximum age of Telegram init data in seconds. Zero disables the check.
    pub init_data_max_age_secs: u64,
    pub owner_rps: u32,
    pub public_rps: u32,
    /// Key rate limits by `X-Forwarded-For`; enable only behind a proxy that
    /// sets the header.
    pub trust_forwarded_for: bool,
    pub max_tests_per_user: i64,
    pub max_questions_per_test: i64,
    pub uploads_dir: String,
    pub max_upload_bytes: usize,
    pub notify_owners: bool,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            telegram_bot_token: get_env("TELEGRAM_BOT_TOKEN")?,
            webapp_url: env::var("WEBAPP_URL").ok().filter(|v| !v.trim().is_empty()),
            init_data_max_age_secs: get_env_parse_or("INIT_DATA_MAX_AGE_SECS", 86_400)?,
            owner_rps: get_env_parse_or("OWNER_RPS", 20)?,
            public_rps: get_env_parse_or("PUBLIC_RPS", 50)?,
            trust_forwarded_for: get_env_parse_or("TRUST_FORWARDED_FOR", false)?,
            max_tests_per_user: get_env_parse_or("MAX_TESTS_PER_USER", 50)?,
            max_questions_per_test: get_env_parse_or("MAX_QUESTIONS_PER_TEST", 100)?,
            uploads_dir: env::var("UPLOADS_DIR").unwrap_or_else(|_| "./uploads".to_string()),
            max_upload_bytes: get_env_parse_or("MAX_UPLOAD_BYTES", 5 * 1024 * 1024)?,
            notify_owners: get_env_parse_or("NOTIFY_OWNERS", false)?,
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
