use async_trait::async_trait;
use thiserror::Error;

use crate::domain::exit_signals::{ExitAction, ExitSignal};
use crate::domain::position::Position;

/// Notification error type
#[derive(Error, Debug, Clone)]
pub enum NotifyError {
    #[error("Notifier not configured: {0}")]
    NotConfigured(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Message rejected: {0}")]
    Rejected(String),
}

/// Delivers exit alerts to the user
#[async_trait]
pub trait AlertNotifier: Send + Sync {
    /// Send one alert for a position
    async fn notify(
        &self,
        position: &Position,
        action: ExitAction,
        signals: &[ExitSignal],
    ) -> Result<(), NotifyError>;

    /// Channel name for logs
    fn name(&self) -> &str;
}
