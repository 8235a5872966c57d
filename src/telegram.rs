use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;

/// Attempts made by [`Notifier::send`] unless told otherwise.
pub const MAX_ATTEMPTS: u32 = 3;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// One delivery attempt to the chat. Errors cover both transport failures
/// and API-level rejections.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn send_message(&self, text: &str) -> Result<()>;
}

pub struct TelegramClient {
    client: Client,
    url: String,
    chat_id: String,
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramClient {
    pub fn new(api_base: &str, token: &str, chat_id: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            url: format!("{api_base}{token}/sendMessage"),
            chat_id: chat_id.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.bot_api, &config.bot_token, &config.chat_id)
    }
}

#[async_trait::async_trait]
impl Transport for TelegramClient {
    async fn send_message(&self, text: &str) -> Result<()> {
        let request = SendMessageRequest {
            chat_id: &self.chat_id,
            text,
            parse_mode: "Markdown",
        };

        // The URL embeds the token, so it stays out of error messages.
        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to call Telegram API: {}", e.without_url()))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let parsed: ApiResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(_) => anyhow::bail!("Telegram API error ({status}): {body}"),
        };

        if !parsed.ok {
            anyhow::bail!(
                "Telegram API error: {}",
                parsed.description.as_deref().unwrap_or("no description")
            );
        }
        Ok(())
    }
}

/// Wait before retrying after the given (1-based) failed attempt.
pub fn retry_delay(attempt: u32) -> Duration {
    Duration::from_secs(u64::from(attempt) * 2)
}

/// Delivers messages through a [`Transport`], retrying with linear backoff.
pub struct Notifier {
    transport: Box<dyn Transport>,
}

impl Notifier {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Returns whether any attempt succeeded. Never errors; failures are logged.
    pub async fn send(&self, text: &str, max_attempts: u32) -> bool {
        for attempt in 1..=max_attempts {
            match self.transport.send_message(text).await {
                Ok(()) => {
                    tracing::info!(attempt, "Reminder sent");
                    return true;
                }
                Err(e) => {
                    tracing::error!(attempt, "Send attempt failed: {e:#}");
                    if attempt < max_attempts {
                        let delay = retry_delay(attempt);
                        tracing::info!("Retrying in {} seconds", delay.as_secs());
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        tracing::error!(max_attempts, "All send attempts failed");
        false
    }
}
