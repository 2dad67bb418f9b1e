//! Telegram Bot API delivery

use serde::Serialize;
use std::time::Duration;

use super::Notifier;
use crate::core::{ScanError, ScanResult};

const TELEGRAM_API: &str = "https://api.telegram.org";

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

/// Posts messages through `sendMessage` with Markdown formatting
pub struct TelegramNotifier {
    client: reqwest::blocking::Client,
    api_url: String,
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(token: impl Into<String>, chat_id: impl Into<String>) -> ScanResult<Self> {
        let token = token.into();
        let chat_id = chat_id.into();
        if token.trim().is_empty() || chat_id.trim().is_empty() {
            return Err(ScanError::config("Telegram token and chat id must be non-empty"));
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| ScanError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: TELEGRAM_API.to_string(),
            token,
            chat_id,
        })
    }

    /// Point at a different Bot API host
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_url, self.token)
    }
}

impl Notifier for TelegramNotifier {
    fn send(&self, message: &str) -> ScanResult<()> {
        let body = SendMessage {
            chat_id: &self.chat_id,
            text: message,
            parse_mode: "Markdown",
        };

        let resp = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .map_err(|e| ScanError::notification(format!("Telegram unreachable: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().unwrap_or_default();
            return Err(ScanError::notification(format!(
                "Telegram rejected message: HTTP {status}: {text}"
            )));
        }

        tracing::debug!(chat_id = %self.chat_id, "Telegram message delivered");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "telegram"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_credentials() {
        assert!(TelegramNotifier::new("", "123").is_err());
        assert!(TelegramNotifier::new("abc", " ").is_err());
    }

    #[test]
    fn test_endpoint_and_payload() {
        let notifier = TelegramNotifier::new("42:token", "1001")
            .unwrap()
            .with_api_url("http://localhost:9");
        assert_eq!(notifier.endpoint(), "http://localhost:9/bot42:token/sendMessage");

        let body = SendMessage {
            chat_id: "1001",
            text: "*hi*",
            parse_mode: "Markdown",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["parse_mode"], "Markdown");
        assert_eq!(json["chat_id"], "1001");
    }

    #[test]
    #[ignore] // Requires network
    fn test_unreachable_host_is_notification_error() {
        // Port 9 (discard) is not expected to serve HTTP
        let notifier = TelegramNotifier::new("t", "c")
            .unwrap()
            .with_api_url("http://127.0.0.1:9");
        let err = notifier.send("hello").unwrap_err();
        assert!(matches!(err, ScanError::Notification(_)));
    }
}
