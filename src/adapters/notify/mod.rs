//! Alert Notifiers
//!
//! `AlertNotifier` implementations:
//! - `LogNotifier`: writes the alert block through `tracing`
//! - `TelegramNotifier`: Telegram Bot API `sendMessage`
//! - `MultiNotifier`: fans out to several notifiers

mod message;
mod telegram;

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::exit_signals::{ExitAction, ExitSignal};
use crate::domain::position::Position;
use crate::ports::notifier::{AlertNotifier, NotifyError};

pub use message::format_exit_message;
pub use telegram::{TelegramNotifier, TELEGRAM_API_BASE};

const SEPARATOR: &str = "============================================================";

/// Console channel; always available
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AlertNotifier for LogNotifier {
    async fn notify(
        &self,
        position: &Position,
        action: ExitAction,
        signals: &[ExitSignal],
    ) -> Result<(), NotifyError> {
        let text = format_exit_message(position, action, signals);
        match action {
            ExitAction::SellNow => tracing::warn!("\n{}\n{}\n{}", SEPARATOR, text, SEPARATOR),
            _ => tracing::info!("\n{}\n{}\n{}", SEPARATOR, text, SEPARATOR),
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Delivers each alert to every inner notifier.
///
/// Individual failures are logged; the call fails only when every channel
/// failed.
#[derive(Clone, Default)]
pub struct MultiNotifier {
    notifiers: Vec<Arc<dyn AlertNotifier>>,
}

impl MultiNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, notifier: Arc<dyn AlertNotifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }

    pub fn channel_names(&self) -> Vec<String> {
        self.notifiers.iter().map(|n| n.name().to_string()).collect()
    }
}

#[async_trait]
impl AlertNotifier for MultiNotifier {
    async fn notify(
        &self,
        position: &Position,
        action: ExitAction,
        signals: &[ExitSignal],
    ) -> Result<(), NotifyError> {
        let mut last_error = None;
        let mut delivered = 0usize;

        for notifier in &self.notifiers {
            match notifier.notify(position, action, signals).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::error!(
                        "{} notifier failed for {}: {}",
                        notifier.name(),
                        position.symbol,
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if delivered == 0 => Err(e),
            _ => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "multi"
    }
}
