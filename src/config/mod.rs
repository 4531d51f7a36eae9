//! Configuration Module
//!
//! Loads and validates configuration from TOML files.

pub mod loader;

pub use loader::{
    load_config, AlertsSection, Config, ConfigError, DexScreenerSection, LoggingSection,
    MonitorSection, ScannerSection, StorageSection,
};
