use async_trait::async_trait;
use reqwest::Client;

use super::Notifier;
use crate::error::Error;
use crate::Result;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Sends HTML messages to a Telegram chat through the bot API
#[derive(Clone)]
pub struct TelegramNotifier {
    client: Client,
    base_url: String,
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(token: String, chat_id: String) -> Result<Self> {
        Self::with_base_url(TELEGRAM_API_BASE, token, chat_id)
    }

    pub fn with_base_url(base_url: &str, token: String, chat_id: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            chat_id,
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.token);
        let form = [
            ("chat_id", self.chat_id.as_str()),
            ("text", message),
            ("parse_mode", "HTML"),
        ];

        let response = self
            .client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::NotificationFailure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::NotificationFailure(format!(
                "Telegram returned {}",
                status
            )));
        }

        Ok(())
    }
}

/// Writes notifications to the log; used when no chat is configured
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        tracing::info!("📢 {}", message.replace('\n', " | "));
        Ok(())
    }
}
