//! Telegram Bot API notifier

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::message::format_exit_message;
use crate::domain::exit_signals::{ExitAction, ExitSignal};
use crate::domain::position::Position;
use crate::ports::notifier::{AlertNotifier, NotifyError};

/// Default Telegram Bot API base URL
pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

const URGENT_PREFIX: &str = "URGENT ALERT\n\n";

#[derive(Debug, Clone, Serialize, PartialEq)]
struct SendMessage {
    chat_id: String,
    text: String,
    disable_web_page_preview: bool,
}

/// Sends alerts to one Telegram chat
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    bot_token: String,
    chat_id: String,
    api_base: String,
    http: Client,
}

impl TelegramNotifier {
    pub fn new(
        bot_token: impl Into<String>,
        chat_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, NotifyError> {
        let bot_token = bot_token.into();
        let chat_id = chat_id.into();
        if bot_token.is_empty() || chat_id.is_empty() {
            return Err(NotifyError::NotConfigured(
                "Telegram bot token and chat id are required".to_string(),
            ));
        }

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            bot_token,
            chat_id,
            api_base: TELEGRAM_API_BASE.to_string(),
            http,
        })
    }

    /// Override the API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.bot_token)
    }

    fn payload(&self, action: ExitAction, body: String) -> SendMessage {
        let text = if action == ExitAction::SellNow {
            format!("{}{}", URGENT_PREFIX, body)
        } else {
            body
        };
        SendMessage {
            chat_id: self.chat_id.clone(),
            text,
            disable_web_page_preview: true,
        }
    }

    async fn post(&self, payload: &SendMessage) -> Result<(), NotifyError> {
        // The URL embeds the token; keep it out of error messages
        let response = self
            .http
            .post(self.endpoint())
            .json(payload)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected(format!("HTTP {}: {}", status, body)));
        }
        Ok(())
    }
}

#[async_trait]
impl AlertNotifier for TelegramNotifier {
    async fn notify(
        &self,
        position: &Position,
        action: ExitAction,
        signals: &[ExitSignal],
    ) -> Result<(), NotifyError> {
        let body = format_exit_message(position, action, signals);
        self.post(&self.payload(action, body)).await?;
        tracing::info!("Telegram {} alert sent for {}", action, position.symbol);
        Ok(())
    }

    fn name(&self) -> &str {
        "telegram"
    }
}
