//! Domain Layer - Core evaluation logic for memescope
//!
//! Pure types and logic with no I/O apart from the tracker's portfolio file.
//! All market data and notification access goes through the ports layer.
//!
//! ## Scoring funnel
//! - `snapshot`: normalized token market state
//! - `safety_filter`: stage-1 admission gate
//! - `scoring`: volume, price, holder and safety component scores
//! - `ranker`: composite score, risk flags and re-check interval
//!
//! ## Position monitoring
//! - `position`: tracked position, partial updates and alerts
//! - `position_tracker`: entity store with JSON persistence
//! - `exit_signals`: entry-vs-live exit decision

pub mod snapshot;
pub mod safety_filter;
pub mod scoring;
pub mod ranker;
pub mod position;
pub mod position_tracker;
pub mod exit_signals;

pub use snapshot::{format_usd, Snapshot, TxCount, TxWindows, Windows, DEFAULT_AGE_HOURS};
pub use safety_filter::{FilterConfig, FilterOutcome, SafetyFilter};
pub use scoring::{ComponentScores, ScoringError};
pub use ranker::{CompositeRanker, KeyMetrics, RiskFlag, ScoreResult, ScoreStatus};
pub use position::{Alert, Position, PositionStatus, PositionUpdate, Urgency};
pub use position_tracker::{
    PersistError, PortfolioFile, PortfolioLock, PortfolioSummary, PositionTracker, TrackerError,
};
pub use exit_signals::{
    price_change_since_entry, ExitAction, ExitEvaluation, ExitSignal, ExitSignalEvaluator,
    Severity, SignalType,
};
