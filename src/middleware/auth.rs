use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::utils::telegram_auth::verify_init_data;
use crate::AppState;

const SCHEME: &str = "tma ";

/// The verified caller, available to handlers as `Extension<AuthUser>`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub telegram_id: i64,
    pub first_name: String,
}

pub fn init_data_from_headers(headers: &HeaderMap) -> Result<&str> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| Error::Unauthorized("Missing Authorization header".to_string()))?
        .to_str()
        .map_err(|_| Error::Unauthorized("Malformed Authorization header".to_string()))?;
    value
        .strip_prefix(SCHEME)
        .map(str::trim)
        .filter(|data| !data.is_empty())
        .ok_or_else(|| Error::Unauthorized("Unsupported authorization scheme".to_string()))
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AuthUser> {
    let init_data = init_data_from_headers(headers)?;
    let config = crate::config::get_config();
    let tg = verify_init_data(
        init_data,
        &config.telegram_bot_token,
        config.init_data_max_age_secs,
        Utc::now(),
    )
    .map_err(|e| Error::Unauthorized(e.to_string()))?;

    let user = state.user_service.upsert_telegram_user(&tg).await?;
    Ok(AuthUser {
        user_id: user.id,
        telegram_id: user.telegram_id,
        first_name: user.first_name,
    })
}

pub async fn require_telegram_user(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    match authenticate(&state, req.headers()).await {
        Ok(user) => {
            tracing::debug!(user_id = %user.user_id, "Authenticated Telegram user");
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Err(err) => err.into_response(),
    }
}
