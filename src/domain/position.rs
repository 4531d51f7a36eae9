//! Tracked Position
//!
//! One record per token a user chose to follow: the entry snapshot and score,
//! the latest live reading and the status derived from the last exit-signal
//! evaluation. Positions are owned by the `PositionTracker`; everything else
//! sees clones.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::exit_signals::{ExitAction, ExitSignal};
use super::ranker::ScoreResult;
use super::snapshot::Snapshot;

/// Position lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionStatus {
    Watching,
    Profit,
    Danger,
    Exited,
}

impl fmt::Display for PositionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionStatus::Watching => write!(f, "watching"),
            PositionStatus::Profit => write!(f, "profit"),
            PositionStatus::Danger => write!(f, "danger"),
            PositionStatus::Exited => write!(f, "exited"),
        }
    }
}

/// A tracked token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: String,
    pub symbol: String,
    pub address: String,
    #[serde(default)]
    pub dex_url: Option<String>,
    /// Amount the user says they put in (informational)
    #[serde(default)]
    pub investment_amount: f64,
    pub entry_time: DateTime<Utc>,
    pub entry_snapshot: Snapshot,
    /// Full ranking at entry, including component scores and risk flags
    pub entry_score: ScoreResult,
    #[serde(default)]
    pub current_snapshot: Option<Snapshot>,
    /// Latest live ranking; only analyzed results are kept
    #[serde(default)]
    pub current_score: Option<ScoreResult>,
    pub status: PositionStatus,
    /// Change since entry as of the last live reading
    #[serde(default)]
    pub price_change_pct: f64,
    #[serde(default)]
    pub profit_loss_pct: f64,
    #[serde(default)]
    pub peak_profit_pct: f64,
    #[serde(default)]
    pub exit_signals: Vec<ExitSignal>,
    #[serde(default)]
    pub last_action: Option<ExitAction>,
    #[serde(default)]
    pub last_alert_time: Option<DateTime<Utc>>,
    /// Minutes since entry, one decimal, refreshed on every update
    #[serde(default)]
    pub time_held_minutes: f64,
}

impl Position {
    /// Open a position from an entry snapshot and its ranking
    pub fn open(
        id: String,
        snapshot: Snapshot,
        score: &ScoreResult,
        investment_amount: f64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            symbol: snapshot.symbol.clone(),
            address: snapshot.address.clone(),
            dex_url: snapshot.dex_url.clone(),
            investment_amount,
            entry_time: now,
            entry_score: score.clone(),
            entry_snapshot: snapshot,
            current_snapshot: None,
            current_score: None,
            status: PositionStatus::Watching,
            price_change_pct: 0.0,
            profit_loss_pct: 0.0,
            peak_profit_pct: 0.0,
            exit_signals: Vec::new(),
            last_action: None,
            last_alert_time: None,
            time_held_minutes: 0.0,
        }
    }

    /// Whether a live reading has been applied since entry
    pub fn has_live_reading(&self) -> bool {
        self.current_snapshot.is_some()
    }

    /// Whether an alert was sent less than `cooldown_secs` before `now`
    pub fn in_alert_cooldown(&self, now: DateTime<Utc>, cooldown_secs: i64) -> bool {
        match self.last_alert_time {
            Some(last) => (now - last).num_seconds() < cooldown_secs,
            None => false,
        }
    }

    /// Merge a partial update and refresh the holding time
    pub fn apply(&mut self, update: PositionUpdate, now: DateTime<Utc>) {
        if let Some(snapshot) = update.current_snapshot {
            self.current_snapshot = Some(snapshot);
        }
        if let Some(score) = update.current_score {
            self.current_score = Some(score);
        }
        if let Some(change) = update.price_change_pct {
            self.price_change_pct = change;
        }
        if let Some(pnl) = update.profit_loss_pct {
            self.profit_loss_pct = pnl;
            self.peak_profit_pct = self.peak_profit_pct.max(pnl);
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(signals) = update.exit_signals {
            self.exit_signals = signals;
        }
        if let Some(action) = update.last_action {
            self.last_action = Some(action);
        }
        if let Some(at) = update.last_alert_time {
            self.last_alert_time = Some(at);
        }

        let held_secs = (now - self.entry_time).num_milliseconds() as f64 / 1000.0;
        self.time_held_minutes = (held_secs / 60.0 * 10.0).round() / 10.0;
    }

    /// Holding time as "2h 5m" or "45m"
    pub fn time_held_display(&self) -> String {
        let total = self.time_held_minutes.max(0.0) as u64;
        let (hours, mins) = (total / 60, total % 60);
        if hours > 0 {
            format!("{}h {}m", hours, mins)
        } else {
            format!("{}m", mins)
        }
    }
}

/// Partial update merged into a position; `None` fields are left alone
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionUpdate {
    pub current_snapshot: Option<Snapshot>,
    pub current_score: Option<ScoreResult>,
    pub price_change_pct: Option<f64>,
    pub profit_loss_pct: Option<f64>,
    pub status: Option<PositionStatus>,
    pub exit_signals: Option<Vec<ExitSignal>>,
    pub last_action: Option<ExitAction>,
    pub last_alert_time: Option<DateTime<Utc>>,
}

impl PositionUpdate {
    pub fn status(status: PositionStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn alerted_at(at: DateTime<Utc>) -> Self {
        Self {
            last_alert_time: Some(at),
            ..Default::default()
        }
    }
}

/// Alert urgency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Critical,
    High,
    Medium,
    Low,
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Urgency::Critical => write!(f, "critical"),
            Urgency::High => write!(f, "high"),
            Urgency::Medium => write!(f, "medium"),
            Urgency::Low => write!(f, "low"),
        }
    }
}

/// Persisted alert raised for a position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub investment_id: String,
    pub alert_type: String,
    pub message: String,
    pub urgency: Urgency,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub acknowledged: bool,
}
