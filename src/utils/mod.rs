pub mod slug;
pub mod telegram_auth;
