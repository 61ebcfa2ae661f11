use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// The `user` object Telegram embeds in Mini App init data.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub language_code: Option<String>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InitDataError {
    #[error("init data has no hash")]
    MissingHash,
    #[error("init data signature mismatch")]
    BadSignature,
    #[error("init data has no valid auth_date")]
    MissingAuthDate,
    #[error("init data is expired")]
    Expired,
    #[error("init data has no valid user")]
    MissingUser,
}

fn secret_key(bot_token: &str) -> Vec<u8> {
    let mut mac =
        HmacSha256::new_from_slice(b"WebAppData").expect("HMAC accepts keys of any length");
    mac.update(bot_token.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

fn data_check_string(pairs: &[(String, String)]) -> String {
    let mut sorted: Vec<&(String, String)> = pairs.iter().filter(|(k, _)| k != "hash").collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));
    sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("\n")
}

fn signature(pairs: &[(String, String)], bot_token: &str) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(&secret_key(bot_token))
        .expect("HMAC accepts keys of any length");
    mac.update(data_check_string(pairs).as_bytes());
    mac.finalize().into_bytes().to_vec()
}

/// Verifies Mini App init data against the bot token and returns the
/// embedded user. `max_age_secs == 0` disables the freshness check.
pub fn verify_init_data(
    init_data: &str,
    bot_token: &str,
    max_age_secs: u64,
    now: DateTime<Utc>,
) -> Result<TelegramUser, InitDataError> {
    let pairs: Vec<(String, String)> = url::form_urlencoded::parse(init_data.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let provided = pairs
        .iter()
        .find(|(k, _)| k == "hash")
        .map(|(_, v)| v.as_str())
        .ok_or(InitDataError::MissingHash)?;
    let provided = hex::decode(provided).map_err(|_| InitDataError::BadSignature)?;

    let expected = signature(&pairs, bot_token);
    if !bool::from(expected.ct_eq(&provided)) {
        return Err(InitDataError::BadSignature);
    }

    let auth_date: i64 = pairs
        .iter()
        .find(|(k, _)| k == "auth_date")
        .and_then(|(_, v)| v.parse().ok())
        .ok_or(InitDataError::MissingAuthDate)?;
    if max_age_secs > 0 && now.timestamp() - auth_date > max_age_secs as i64 {
        return Err(InitDataError::Expired);
    }

    pairs
        .iter()
        .find(|(k, _)| k == "user")
        .and_then(|(_, v)| serde_json::from_str::<TelegramUser>(v).ok())
        .ok_or(InitDataError::MissingUser)
}

/// Produces init data signed with `bot_token`, the way Telegram does. Used by
/// local tooling and tests to talk to the API without a real client.
pub fn sign_init_data(fields: &[(&str, &str)], bot_token: &str) -> String {
    let pairs: Vec<(String, String)> = fields
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let hash = hex::encode(signature(&pairs, bot_token));

    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (k, v) in &pairs {
        serializer.append_pair(k, v);
    }
    serializer.append_pair("hash", &hash);
    serializer.finish()
}
