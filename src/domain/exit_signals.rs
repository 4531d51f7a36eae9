//! Exit-Signal Evaluator
//!
//! Compares a position's entry snapshot with a live snapshot and decides what
//! the holder should do. Tiers are checked in strict priority and the first
//! tier that produces any signal wins:
//!
//! 1. Critical -> `SELL_NOW` / danger
//! 2. Profit   -> `TAKE_PROFIT` / profit
//! 3. Warning  -> `WARNING` / watching
//! 4. Nothing  -> `HOLD` / watching
//!
//! The evaluator never mutates the position; callers apply the returned
//! status themselves.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::position::{Position, PositionStatus};
use super::snapshot::Snapshot;

/// Change since entry at or below which the position is cut (percent)
pub const CRITICAL_LOSS_PCT: f64 = -15.0;
/// Bounds of the moderate loss band, `[STOP_LOSS_PCT, WARNING_LOSS_PCT)`
pub const STOP_LOSS_PCT: f64 = -10.0;
pub const WARNING_LOSS_PCT: f64 = -5.0;
/// Liquidity drop since entry that signals a rug (percent)
pub const LIQUIDITY_CRASH_PCT: f64 = -30.0;
/// 24h volume drop since entry that signals a dead market (percent)
pub const VOLUME_DEATH_PCT: f64 = -50.0;
/// Volume decline that only warrants a warning (exclusive lower bound)
pub const VOLUME_DECLINE_PCT: f64 = -20.0;
/// Live 1h change below which the token is dumping
pub const HEAVY_DUMP_1H_PCT: f64 = -20.0;

pub const PROFIT_2X_PCT: f64 = 100.0;
pub const PROFIT_5X_PCT: f64 = 400.0;
pub const PROFIT_10X_PCT: f64 = 900.0;
/// Gain above which a negative 1h move counts as a reversal
pub const REVERSAL_MIN_GAIN_PCT: f64 = 50.0;
pub const REVERSAL_1H_PCT: f64 = -5.0;

/// Composite score drop (points) that raises a warning
pub const SCORE_DROP_POINTS: f64 = 2.0;

/// What the holder should do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitAction {
    SellNow,
    TakeProfit,
    Warning,
    Hold,
}

impl ExitAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitAction::SellNow => "SELL_NOW",
            ExitAction::TakeProfit => "TAKE_PROFIT",
            ExitAction::Warning => "WARNING",
            ExitAction::Hold => "HOLD",
        }
    }

    /// Whether the action should reach the user
    pub fn is_alert(&self) -> bool {
        !matches!(self, ExitAction::Hold)
    }
}

impl fmt::Display for ExitAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalType {
    CriticalLoss,
    LiquidityCrash,
    VolumeDeath,
    HeavyDump,
    #[serde(rename = "PROFIT_10X")]
    Profit10x,
    #[serde(rename = "PROFIT_5X")]
    Profit5x,
    #[serde(rename = "PROFIT_2X")]
    Profit2x,
    MomentumReversal,
    ModerateLoss,
    ScoreDrop,
    VolumeDeclining,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

/// One reason behind an exit action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitSignal {
    #[serde(rename = "type")]
    pub signal_type: SignalType,
    pub severity: Severity,
    pub message: String,
    /// The metric that triggered the signal (percent, or points for score)
    pub value: f64,
}

impl ExitSignal {
    fn new(signal_type: SignalType, severity: Severity, message: String, value: f64) -> Self {
        Self {
            signal_type,
            severity,
            message,
            value,
        }
    }
}

/// Result of evaluating one position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitEvaluation {
    pub action: ExitAction,
    pub signals: Vec<ExitSignal>,
    pub status: PositionStatus,
    /// Change since entry used by every tier
    pub change_since_entry_pct: f64,
}

impl ExitEvaluation {
    fn new(
        action: ExitAction,
        signals: Vec<ExitSignal>,
        status: PositionStatus,
        change: f64,
    ) -> Self {
        Self {
            action,
            signals,
            status,
            change_since_entry_pct: change,
        }
    }
}

/// Change since entry in percent.
///
/// Market cap is the price proxy when both caps are positive; otherwise the
/// live 24h price change stands in.
pub fn price_change_since_entry(entry: &Snapshot, current: &Snapshot) -> f64 {
    if entry.market_cap > 0.0 && current.market_cap > 0.0 {
        (current.market_cap - entry.market_cap) / entry.market_cap * 100.0
    } else {
        current.price_change_pct.h24
    }
}

/// Relative change in percent, `None` when there is no baseline
fn pct_change(entry: f64, current: f64) -> Option<f64> {
    if entry > 0.0 {
        Some((current - entry) / entry * 100.0)
    } else {
        None
    }
}

/// Stateless exit decision logic
#[derive(Debug, Clone, Copy, Default)]
pub struct ExitSignalEvaluator;

impl ExitSignalEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate a position against a live snapshot.
    ///
    /// `current_score` is the live composite score, or `None` when the live
    /// snapshot could not be scored; no score-drop warning is raised then.
    pub fn evaluate(
        &self,
        position: &Position,
        current: &Snapshot,
        current_score: Option<f64>,
    ) -> ExitEvaluation {
        let entry = &position.entry_snapshot;
        let change = price_change_since_entry(entry, current);
        let liquidity_change = pct_change(entry.liquidity_usd, current.liquidity_usd);
        let volume_change = pct_change(entry.volume.h24, current.volume.h24);
        let price_1h = current.price_change_pct.h1;

        let critical = Self::critical_signals(change, liquidity_change, volume_change, price_1h);
        if !critical.is_empty() {
            return ExitEvaluation::new(
                ExitAction::SellNow,
                critical,
                PositionStatus::Danger,
                change,
            );
        }

        let profit = Self::profit_signals(change, price_1h);
        if !profit.is_empty() {
            return ExitEvaluation::new(
                ExitAction::TakeProfit,
                profit,
                PositionStatus::Profit,
                change,
            );
        }

        let entry_score = position.entry_score.final_score;
        let warnings = Self::warning_signals(change, entry_score, current_score, volume_change);
        if !warnings.is_empty() {
            return ExitEvaluation::new(
                ExitAction::Warning,
                warnings,
                PositionStatus::Watching,
                change,
            );
        }

        ExitEvaluation::new(ExitAction::Hold, Vec::new(), PositionStatus::Watching, change)
    }

    fn critical_signals(
        change: f64,
        liquidity_change: Option<f64>,
        volume_change: Option<f64>,
        price_1h: f64,
    ) -> Vec<ExitSignal> {
        let mut signals = Vec::new();

        if change <= CRITICAL_LOSS_PCT {
            signals.push(ExitSignal::new(
                SignalType::CriticalLoss,
                Severity::Critical,
                format!("SELL NOW! Price down {:.1}% from entry", change),
                change,
            ));
        }

        if let Some(liq) = liquidity_change.filter(|c| *c <= LIQUIDITY_CRASH_PCT) {
            signals.push(ExitSignal::new(
                SignalType::LiquidityCrash,
                Severity::Critical,
                format!("RUG PULL WARNING! Liquidity dropped {:.1}%", liq.abs()),
                liq,
            ));
        }

        if let Some(vol) = volume_change.filter(|c| *c <= VOLUME_DEATH_PCT) {
            signals.push(ExitSignal::new(
                SignalType::VolumeDeath,
                Severity::Critical,
                format!("Volume collapsed {:.1}% - no buyers", vol.abs()),
                vol,
            ));
        }

        if price_1h < HEAVY_DUMP_1H_PCT {
            signals.push(ExitSignal::new(
                SignalType::HeavyDump,
                Severity::Critical,
                format!("Heavy dumping! Down {:.1}% in the last hour", price_1h.abs()),
                price_1h,
            ));
        }

        signals
    }

    fn profit_signals(change: f64, price_1h: f64) -> Vec<ExitSignal> {
        let mut signals = Vec::new();

        // Only the highest milestone is reported
        if change >= PROFIT_10X_PCT {
            signals.push(ExitSignal::new(
                SignalType::Profit10x,
                Severity::High,
                format!("10x PROFIT! Up {:.1}% - consider taking profits", change),
                change,
            ));
        } else if change >= PROFIT_5X_PCT {
            signals.push(ExitSignal::new(
                SignalType::Profit5x,
                Severity::High,
                format!("5x PROFIT! Up {:.1}% - consider taking some profit", change),
                change,
            ));
        } else if change >= PROFIT_2X_PCT {
            signals.push(ExitSignal::new(
                SignalType::Profit2x,
                Severity::Medium,
                format!("2x PROFIT! Up {:.1}% - good time to secure gains", change),
                change,
            ));
        }

        if change > REVERSAL_MIN_GAIN_PCT && price_1h < REVERSAL_1H_PCT {
            signals.push(ExitSignal::new(
                SignalType::MomentumReversal,
                Severity::Medium,
                format!(
                    "Up {:.1}% total, but momentum turning negative (1h: {:.1}%)",
                    change, price_1h
                ),
                change,
            ));
        }

        signals
    }

    fn warning_signals(
        change: f64,
        entry_score: f64,
        current_score: Option<f64>,
        volume_change: Option<f64>,
    ) -> Vec<ExitSignal> {
        let mut signals = Vec::new();

        if (STOP_LOSS_PCT..WARNING_LOSS_PCT).contains(&change) {
            signals.push(ExitSignal::new(
                SignalType::ModerateLoss,
                Severity::Medium,
                format!("Down {:.1}% - monitor closely", change.abs()),
                change,
            ));
        }

        if let Some(score) = current_score {
            let delta = score - entry_score;
            if entry_score > 0.0 && delta < -SCORE_DROP_POINTS {
                signals.push(ExitSignal::new(
                    SignalType::ScoreDrop,
                    Severity::Medium,
                    format!("Quality score dropped {:.1} points", delta.abs()),
                    delta,
                ));
            }
        }

        if let Some(vol) = volume_change {
            if vol > VOLUME_DEATH_PCT && vol < VOLUME_DECLINE_PCT {
                signals.push(ExitSignal::new(
                    SignalType::VolumeDeclining,
                    Severity::Low,
                    format!("Volume declining ({:.1}%)", vol),
                    vol,
                ));
            }
        }

        signals
    }
}
