//! Telegram failure notifications.

use reqwest::Client;
use serde::Serialize;
use tracing::{info, instrument, warn};

const TELEGRAM_API: &str = "https://api.telegram.org";

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// Sends plain-text messages through the Telegram Bot API.
///
/// Delivery problems are logged and otherwise ignored: a failed notification
/// never changes the outcome of a run.
#[derive(Clone)]
pub struct TelegramNotifier {
    http: Client,
    bot_token: String,
    test_chat_id: String,
}

impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("test_chat_id", &self.test_chat_id)
            .finish_non_exhaustive()
    }
}

impl TelegramNotifier {
    pub fn new(bot_token: String, test_chat_id: String) -> Self {
        Self {
            http: Client::new(),
            bot_token,
            test_chat_id,
        }
    }

    fn send_url(&self) -> String {
        format!("{}/bot{}/sendMessage", TELEGRAM_API, self.bot_token)
    }

    /// Send `text` to the operator (test) chat.
    #[instrument(level = "info", skip_all, fields(chat_id = %self.test_chat_id))]
    pub async fn send_test_message(&self, text: &str) -> bool {
        let chat_id = self.test_chat_id.as_str();
        let result = self
            .http
            .post(self.send_url())
            .json(&SendMessage { chat_id, text })
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => {
                info!("Telegram message sent");
                true
            }
            Ok(resp) => {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                warn!(
                    %status,
                    body = %crate::utils::truncate_for_log(&body, 200),
                    "Telegram rejected message"
                );
                false
            }
            Err(e) => {
                // the request error can echo the URL, which carries the token
                warn!(error = %e.without_url(), "Telegram request failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notifier() -> TelegramNotifier {
        TelegramNotifier::new("123:abc".into(), "-200".into())
    }

    #[test]
    fn test_send_url() {
        assert_eq!(
            notifier().send_url(),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
    }

    #[test]
    fn test_payload_shape() {
        let json = serde_json::to_value(SendMessage {
            chat_id: "-200",
            text: "실패",
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"chat_id": "-200", "text": "실패"}));
    }

    #[test]
    fn test_debug_hides_token() {
        assert!(!format!("{:?}", notifier()).contains("abc"));
    }
}
