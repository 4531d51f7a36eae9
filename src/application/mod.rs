//! Application Layer - Use cases wiring domain logic to ports
//!
//! - `scanner`: one-shot candidate scan
//! - `monitor`: recurring exit-signal loop over tracked positions

pub mod scanner;
pub mod monitor;

pub use scanner::{ScanError, ScanReport, Scanner};
pub use monitor::{
    MonitorConfig, MonitorEvent, PositionMonitor, TickReport, DEFAULT_ALERT_COOLDOWN,
    DEFAULT_INTERVAL,
};
