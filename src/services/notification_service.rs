use reqwest::Client;
use serde_json::json;

use crate::error::Result;

const TELEGRAM_API: &str = "https://api.telegram.org";

/// A finished session worth telling the test owner about.
#[derive(Debug, Clone)]
pub struct Completion {
    pub owner_chat_id: i64,
    pub test_title: String,
    pub player_name: String,
    pub result_title: Option<String>,
    pub score: Option<(i32, i32)>,
}

impl Completion {
    pub fn message(&self) -> String {
        let mut text = format!(
            "{} completed your test \"{}\"",
            self.player_name, self.test_title
        );
        if let Some((score, max)) = self.score {
            text.push_str(&format!("\nScore: {}/{}", score, max));
        }
        if let Some(result) = &self.result_title {
            text.push_str(&format!("\nResult: {}", result));
        }
        text
    }
}

#[derive(Clone)]
pub struct NotificationService {
    client: Client,
    bot_token: String,
    enabled: bool,
}

impl NotificationService {
    pub fn new(client: Client, bot_token: String, enabled: bool) -> Self {
        Self {
            client,
            bot_token,
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", TELEGRAM_API, self.bot_token);
        self.client
            .post(&url)
            .json(&json!({ "chat_id": chat_id, "text": text }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Fire-and-forget. Delivery failures are logged and dropped.
    pub fn notify_completion(&self, completion: Completion) {
        if !self.enabled {
            return;
        }
        let service = self.clone();
        tokio::spawn(async move {
            let text = completion.message();
            match service.send_message(completion.owner_chat_id, &text).await {
                Ok(()) => tracing::info!(
                    chat_id = completion.owner_chat_id,
                    "Completion notification sent"
                ),
                Err(e) => tracing::warn!(error = %e, "Failed to send completion notification"),
            }
        });
    }
}
