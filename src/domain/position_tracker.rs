//! Position Tracker
//!
//! Entity store for tracked positions and their alerts. The tracker is the
//! only owner of `Position` records; callers get clones or shared references
//! and hand changes back as `PositionUpdate`s.
//!
//! When opened with a file path the whole portfolio is written as pretty JSON
//! after every mutation. Several processes may share one file (a running
//! monitor and one-shot CLI commands), so every mutation takes a lock file,
//! reloads the portfolio from disk, applies the change and saves before
//! releasing. A failed save is logged and the in-memory change stands.

use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::position::{Alert, Position, PositionStatus, PositionUpdate, Urgency};
use super::ranker::ScoreResult;
use super::snapshot::Snapshot;

/// Default portfolio file name
pub const DEFAULT_PORTFOLIO_FILE: &str = "portfolio.json";

const LOCK_RETRY: Duration = Duration::from_millis(10);
const LOCK_TIMEOUT: Duration = Duration::from_secs(5);
/// A lock file older than this is left over from a crashed process
const STALE_LOCK_AGE: Duration = Duration::from_secs(30);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackerError {
    #[error("Already tracking token: {0}")]
    AlreadyTracking(String),

    #[error("Snapshot has no token address")]
    MissingAddress,

    #[error("Position not found: {0}")]
    NotFound(String),
}

#[derive(Error, Debug, Clone)]
pub enum PersistError {
    #[error("Failed to serialize portfolio: {0}")]
    SerializationError(String),

    #[error("Failed to deserialize portfolio: {0}")]
    DeserializationError(String),

    #[error("Failed to write portfolio file: {0}")]
    WriteError(String),

    #[error("Failed to read portfolio file: {0}")]
    ReadError(String),

    #[error("Failed to create directory: {0}")]
    DirectoryError(String),

    #[error("Failed to lock portfolio file: {0}")]
    LockError(String),
}

fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Exclusive lock on a portfolio file, held as `<file>.lock` until dropped
#[derive(Debug)]
pub struct PortfolioLock {
    path: PathBuf,
}

impl PortfolioLock {
    /// Wait for the lock, taking over a stale one
    pub fn acquire(portfolio: &Path) -> Result<Self, PersistError> {
        let path = sibling_path(portfolio, ".lock");
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| PersistError::DirectoryError(e.to_string()))?;
            }
        }

        let started = Instant::now();
        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(Self { path }),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if Self::is_stale(&path) {
                        tracing::warn!("Removing stale portfolio lock {}", path.display());
                        let _ = fs::remove_file(&path);
                        continue;
                    }
                    if started.elapsed() >= LOCK_TIMEOUT {
                        return Err(PersistError::LockError(format!(
                            "timed out waiting for {}",
                            path.display()
                        )));
                    }
                    thread::sleep(LOCK_RETRY);
                }
                Err(e) => return Err(PersistError::LockError(e.to_string())),
            }
        }
    }

    fn is_stale(path: &Path) -> bool {
        fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| modified.elapsed().ok())
            .is_some_and(|age| age > STALE_LOCK_AGE)
    }
}

impl Drop for PortfolioLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!("Failed to release portfolio lock {}: {}", self.path.display(), e);
        }
    }
}

/// On-disk portfolio layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortfolioFile {
    #[serde(default)]
    pub investments: Vec<Position>,
    #[serde(default)]
    pub alerts: Vec<Alert>,
}

impl PortfolioFile {
    /// Save to disk, creating parent directories as needed.
    ///
    /// The file is written beside the target and renamed over it, so readers
    /// never see a partial portfolio.
    pub fn save(&self, path: &Path) -> Result<(), PersistError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| PersistError::DirectoryError(e.to_string()))?;
            }
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| PersistError::SerializationError(e.to_string()))?;

        let tmp = sibling_path(path, ".tmp");
        fs::write(&tmp, content).map_err(|e| PersistError::WriteError(e.to_string()))?;
        fs::rename(&tmp, path).map_err(|e| PersistError::WriteError(e.to_string()))?;

        tracing::debug!(
            "Portfolio saved: {} positions, {} alerts -> {}",
            self.investments.len(),
            self.alerts.len(),
            path.display()
        );
        Ok(())
    }

    /// Load from disk; a missing or empty file is `Ok(None)`
    pub fn load(path: &Path) -> Result<Option<Self>, PersistError> {
        if !path.exists() {
            return Ok(None);
        }

        let content =
            fs::read_to_string(path).map_err(|e| PersistError::ReadError(e.to_string()))?;

        if content.trim().is_empty() {
            return Ok(None);
        }

        let file: Self = serde_json::from_str(&content)
            .map_err(|e| PersistError::DeserializationError(e.to_string()))?;
        Ok(Some(file))
    }
}

/// Aggregate view of the portfolio
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub total: usize,
    pub watching: usize,
    pub profit: usize,
    pub danger: usize,
    pub exited: usize,
    /// Mean P/L over positions with a live reading, two decimals
    pub avg_profit_pct: f64,
    pub active_alerts: usize,
}

/// Store of tracked positions and alerts
#[derive(Debug, Default)]
pub struct PositionTracker {
    portfolio: PortfolioFile,
    path: Option<PathBuf>,
}

impl PositionTracker {
    /// Tracker that never touches disk
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open a file-backed tracker, loading any existing portfolio.
    ///
    /// A corrupt file is an error rather than an empty portfolio so a bad
    /// write is never silently overwritten.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PersistError> {
        let path = path.into();
        let portfolio = PortfolioFile::load(&path)?.unwrap_or_default();

        tracing::info!(
            "Portfolio loaded from {}: {} positions, {} alerts",
            path.display(),
            portfolio.investments.len(),
            portfolio.alerts.len()
        );

        Ok(Self {
            portfolio,
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Pick up changes other processes made to the portfolio file.
    ///
    /// A missing file keeps the in-memory state.
    pub fn refresh(&mut self) -> Result<(), PersistError> {
        if let Some(path) = &self.path {
            if let Some(portfolio) = PortfolioFile::load(path)? {
                self.portfolio = portfolio;
            }
        }
        Ok(())
    }

    /// Start tracking a token from its entry snapshot and ranking
    pub fn create(
        &mut self,
        snapshot: Snapshot,
        score: &ScoreResult,
        amount: f64,
    ) -> Result<Position, TrackerError> {
        self.create_at(snapshot, score, amount, Utc::now())
    }

    pub fn create_at(
        &mut self,
        snapshot: Snapshot,
        score: &ScoreResult,
        amount: f64,
        now: DateTime<Utc>,
    ) -> Result<Position, TrackerError> {
        if snapshot.address.is_empty() {
            return Err(TrackerError::MissingAddress);
        }

        self.transact(|portfolio| {
            if portfolio.investments.iter().any(|p| p.address == snapshot.address) {
                tracing::warn!("Already tracking {} ({})", snapshot.symbol, snapshot.address);
                return (Err(TrackerError::AlreadyTracking(snapshot.address)), false);
            }

            let position =
                Position::open(Uuid::new_v4().to_string(), snapshot, score, amount, now);
            tracing::info!(
                "Tracking {} ({}) entry score {:.2}",
                position.symbol,
                position.id,
                position.entry_score.final_score
            );

            portfolio.investments.push(position.clone());
            (Ok(position), true)
        })
    }

    /// Stop tracking; false when the id is unknown
    pub fn remove(&mut self, id: &str) -> bool {
        self.transact(|portfolio| {
            let before = portfolio.investments.len();
            portfolio.investments.retain(|p| p.id != id);

            let removed = portfolio.investments.len() < before;
            if removed {
                tracing::info!("Removed position {}", id);
            } else {
                tracing::warn!("Position {} not found", id);
            }
            (removed, removed)
        })
    }

    /// Merge a partial update; false when the id is unknown
    pub fn update(&mut self, id: &str, update: PositionUpdate) -> bool {
        self.update_at(id, update, Utc::now())
    }

    pub fn update_at(&mut self, id: &str, update: PositionUpdate, now: DateTime<Utc>) -> bool {
        self.transact(|portfolio| {
            match portfolio.investments.iter_mut().find(|p| p.id == id) {
                Some(position) => {
                    position.apply(update, now);
                    (true, true)
                }
                None => (false, false),
            }
        })
    }

    pub fn get(&self, id: &str) -> Option<&Position> {
        self.portfolio.investments.iter().find(|p| p.id == id)
    }

    pub fn list(&self) -> &[Position] {
        &self.portfolio.investments
    }

    pub fn len(&self) -> usize {
        self.portfolio.investments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.portfolio.investments.is_empty()
    }

    pub fn is_tracking(&self, address: &str) -> bool {
        self.portfolio.investments.iter().any(|p| p.address == address)
    }

    /// Record an alert for a position
    pub fn add_alert(
        &mut self,
        investment_id: &str,
        alert_type: impl Into<String>,
        message: impl Into<String>,
        urgency: Urgency,
    ) -> Alert {
        self.add_alert_at(investment_id, alert_type, message, urgency, Utc::now())
    }

    pub fn add_alert_at(
        &mut self,
        investment_id: &str,
        alert_type: impl Into<String>,
        message: impl Into<String>,
        urgency: Urgency,
        now: DateTime<Utc>,
    ) -> Alert {
        let alert = Alert {
            id: Uuid::new_v4().to_string(),
            investment_id: investment_id.to_string(),
            alert_type: alert_type.into(),
            message: message.into(),
            urgency,
            timestamp: now,
            acknowledged: false,
        };
        tracing::info!(
            "Alert {} ({}) for position {}",
            alert.alert_type,
            alert.urgency,
            investment_id
        );

        self.transact(|portfolio| {
            portfolio.alerts.push(alert.clone());
            (alert, true)
        })
    }

    pub fn alerts(&self) -> &[Alert] {
        &self.portfolio.alerts
    }

    /// Alerts not yet acknowledged
    pub fn active_alerts(&self) -> Vec<&Alert> {
        self.portfolio
            .alerts
            .iter()
            .filter(|a| !a.acknowledged)
            .collect()
    }

    /// Mark an alert as seen; false when the id is unknown
    pub fn acknowledge_alert(&mut self, id: &str) -> bool {
        self.transact(|portfolio| {
            match portfolio.alerts.iter_mut().find(|a| a.id == id) {
                Some(alert) => {
                    alert.acknowledged = true;
                    (true, true)
                }
                None => (false, false),
            }
        })
    }

    pub fn summary(&self) -> PortfolioSummary {
        let positions = &self.portfolio.investments;
        let count =
            |status: PositionStatus| positions.iter().filter(|p| p.status == status).count();

        let live: Vec<f64> = positions
            .iter()
            .filter(|p| p.has_live_reading())
            .map(|p| p.profit_loss_pct)
            .collect();
        let avg_profit_pct = if live.is_empty() {
            0.0
        } else {
            let avg = live.iter().sum::<f64>() / live.len() as f64;
            (avg * 100.0).round() / 100.0
        };

        PortfolioSummary {
            total: positions.len(),
            watching: count(PositionStatus::Watching),
            profit: count(PositionStatus::Profit),
            danger: count(PositionStatus::Danger),
            exited: count(PositionStatus::Exited),
            avg_profit_pct,
            active_alerts: self.active_alerts().len(),
        }
    }

    /// Run one mutation as lock, reload, apply, save.
    ///
    /// `op` returns its result and whether it changed anything.
    fn transact<T>(&mut self, op: impl FnOnce(&mut PortfolioFile) -> (T, bool)) -> T {
        let Some(path) = self.path.clone() else {
            return op(&mut self.portfolio).0;
        };

        let _lock = match PortfolioLock::acquire(&path) {
            Ok(lock) => Some(lock),
            Err(e) => {
                tracing::warn!("Updating portfolio without lock: {}", e);
                None
            }
        };
        if let Err(e) = self.refresh() {
            tracing::warn!("Reload of {} failed, using cached portfolio: {}", path.display(), e);
        }

        let (result, changed) = op(&mut self.portfolio);
        if changed {
            if let Err(e) = self.portfolio.save(&path) {
                tracing::error!("Failed to save portfolio to {}: {}", path.display(), e);
            }
        }
        result
    }
}
