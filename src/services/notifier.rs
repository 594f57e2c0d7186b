//! Outbound notification dispatch.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;

use crate::error::EngineError;

#[derive(Debug, Clone, Serialize)]
pub struct NotificationPayload {
    pub symbol: String,
    pub message: String,
    pub triggered_value: f64,
}

/// Fire-and-forget dispatcher. Callers log failures and move on; a dead
/// notification channel never fails a batch.
pub trait Notifier {
    fn dispatch(
        &self,
        channel: &str,
        payload: &NotificationPayload,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;
}

#[derive(Clone)]
pub struct TelegramNotifier {
    http: Client,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: String, chat_id: String, timeout: Duration) -> Self {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            http,
            bot_token,
            chat_id,
        }
    }

    fn is_configured(&self) -> bool {
        !self.bot_token.trim().is_empty() && !self.chat_id.trim().is_empty()
    }
}

impl Notifier for TelegramNotifier {
    async fn dispatch(&self, channel: &str, payload: &NotificationPayload) -> Result<(), EngineError> {
        if channel != "telegram" {
            return Err(EngineError::Dispatch(format!(
                "no dispatcher configured for channel {channel}"
            )));
        }
        if !self.is_configured() {
            return Err(EngineError::Dispatch(
                "TELEGRAM_BOT_TOKEN / TELEGRAM_CHAT_ID not configured".to_string(),
            ));
        }

        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let text = format!("🔔 {}\n{}", payload.symbol, payload.message);

        let res = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "chat_id": self.chat_id, "text": text }))
            .send()
            .await
            .map_err(|e| EngineError::Dispatch(e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(EngineError::Dispatch(format!(
                "telegram sendMessage failed: {status} {body}"
            )));
        }

        Ok(())
    }
}
