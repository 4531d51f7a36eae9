//! In-memory port implementations for tests and dry runs

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::market_data::{SnapshotSource, SnapshotSourceError};
use super::notifier::{AlertNotifier, NotifyError};
use crate::domain::exit_signals::{ExitAction, ExitSignal};
use crate::domain::position::Position;
use crate::domain::snapshot::Snapshot;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Snapshot source serving canned data and recording lookups
#[derive(Debug, Default, Clone)]
pub struct MockSnapshotSource {
    candidates: Arc<Mutex<Vec<Snapshot>>>,
    live: Arc<Mutex<HashMap<String, Snapshot>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockSnapshotSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the scan candidates
    pub fn with_candidates(self, candidates: Vec<Snapshot>) -> Self {
        *lock(&self.candidates) = candidates;
        self
    }

    /// Builder method to serve a live snapshot for its address
    pub fn with_live(self, snapshot: Snapshot) -> Self {
        self.set_live(snapshot);
        self
    }

    /// Replace the live snapshot for an address
    pub fn set_live(&self, snapshot: Snapshot) {
        lock(&self.live).insert(snapshot.address.clone(), snapshot);
    }

    /// Make lookups for an address fail
    pub fn fail_address(&self, address: &str) {
        lock(&self.failing).insert(address.to_string());
    }

    /// Addresses looked up so far, in call order
    pub fn get_calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl SnapshotSource for MockSnapshotSource {
    async fn fetch_candidates(&self) -> Result<Vec<Snapshot>, SnapshotSourceError> {
        Ok(lock(&self.candidates).clone())
    }

    async fn fetch_snapshot(&self, address: &str) -> Result<Option<Snapshot>, SnapshotSourceError> {
        lock(&self.calls).push(address.to_string());
        if lock(&self.failing).contains(address) {
            return Err(SnapshotSourceError::RequestError(format!(
                "mock failure for {}",
                address
            )));
        }
        Ok(lock(&self.live).get(address).cloned())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// One delivered notification
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedAlert {
    pub position_id: String,
    pub symbol: String,
    pub action: ExitAction,
    pub signals: Vec<ExitSignal>,
}

/// Notifier that records every alert
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<RecordedAlert>>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifier that records the attempt and then fails
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<RecordedAlert> {
        lock(&self.sent).clone()
    }
}

#[async_trait]
impl AlertNotifier for RecordingNotifier {
    async fn notify(
        &self,
        position: &Position,
        action: ExitAction,
        signals: &[ExitSignal],
    ) -> Result<(), NotifyError> {
        lock(&self.sent).push(RecordedAlert {
            position_id: position.id.clone(),
            symbol: position.symbol.clone(),
            action,
            signals: signals.to_vec(),
        });
        if self.fail {
            return Err(NotifyError::Transport("mock transport down".to_string()));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_source_serves_and_records() {
        let source = MockSnapshotSource::new()
            .with_candidates(vec![Snapshot::new("AAA", "MintA")])
            .with_live(Snapshot::new("BBB", "MintB"));

        assert_eq!(source.fetch_candidates().await.unwrap().len(), 1);
        assert!(source.fetch_snapshot("MintB").await.unwrap().is_some());
        assert!(source.fetch_snapshot("MintZ").await.unwrap().is_none());

        source.fail_address("MintB");
        assert!(source.fetch_snapshot("MintB").await.is_err());
        assert_eq!(source.get_calls(), vec!["MintB", "MintZ", "MintB"]);
    }
}
