//! Ports Layer - Trait definitions for external dependencies
//!
//! This module defines the interfaces (ports) that adapters must implement.
//! Following hexagonal architecture, these traits abstract:
//! - Token market data (scan candidates and live snapshots)
//! - Alert delivery (console, Telegram)

pub mod market_data;
pub mod notifier;
pub mod models;
pub mod mocks;

// Re-export main traits and types
pub use market_data::{SnapshotSource, SnapshotSourceError};
pub use notifier::{AlertNotifier, NotifyError};
pub use models::{RawNumber, RawPair};
pub use mocks::{MockSnapshotSource, RecordedAlert, RecordingNotifier};
