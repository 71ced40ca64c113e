//! Telegram notification delivery
//!
//! Outbound reporting is strictly best-effort: a failed send is logged and
//! forgotten. The trading loop never waits on, retries, or fails because
//! of a notification.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{info, warn};

use crate::common::errors::{BotError, Result};
use crate::common::traits::Notifier;
use crate::config::types::TelegramConfig;

/// Notifier posting messages to a Telegram chat via the Bot API
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    client: Client,
    api_url: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(cfg: &TelegramConfig) -> Result<Self> {
        Self::with_timeout(cfg, Duration::from_secs(10))
    }

    pub fn with_timeout(cfg: &TelegramConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BotError::Internal(e.to_string()))?;

        Ok(Self {
            client,
            api_url: cfg.api_url.trim_end_matches('/').to_string(),
            bot_token: cfg.bot_token.clone(),
            chat_id: cfg.chat_id.clone(),
        })
    }

    async fn send(&self, message: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.api_url, self.bot_token);
        let response = self
            .client
            .post(&url)
            .form(&[("chat_id", self.chat_id.as_str()), ("text", message)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BotError::InvalidResponse(format!(
                "Telegram returned status: {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn report(&self, message: &str) {
        if let Err(e) = self.send(message).await {
            warn!(error = %e, "Telegram delivery failed");
        }
    }
}

/// Notifier that only logs, used when no Telegram chat is configured
#[derive(Debug, Clone, Default)]
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn report(&self, message: &str) {
        info!(%message, "report");
    }
}
