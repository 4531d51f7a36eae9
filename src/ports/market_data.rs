use async_trait::async_trait;
use thiserror::Error;

use crate::domain::snapshot::Snapshot;

/// Market data error type
#[derive(Error, Debug, Clone)]
pub enum SnapshotSourceError {
    #[error("HTTP request failed: {0}")]
    RequestError(String),

    #[error("Unexpected HTTP status {status} from {url}")]
    StatusError { status: u16, url: String },

    #[error("Response parsing error: {0}")]
    ParseError(String),

    #[error("Request timed out: {0}")]
    Timeout(String),
}

/// Source of token snapshots.
///
/// Implementations own their I/O timeouts and convert raw records into
/// `Snapshot`s, so every default rule is applied before data reaches the
/// domain.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetch a batch of scan candidates, deduplicated by pair
    async fn fetch_candidates(&self) -> Result<Vec<Snapshot>, SnapshotSourceError>;

    /// Fetch the live snapshot for one token; `Ok(None)` when no pair is listed
    async fn fetch_snapshot(&self, address: &str) -> Result<Option<Snapshot>, SnapshotSourceError>;

    /// Source name for logs
    fn name(&self) -> &str;
}
