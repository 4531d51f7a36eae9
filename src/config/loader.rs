//! Configuration Loader
//!
//! Loads and validates configuration from TOML files matching
//! config/default.toml. Every section is optional and falls back to the
//! built-in defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::adapters::dexscreener::{default_search_queries, DexScreenerConfig, DEFAULT_BASE_URL};
use crate::application::monitor::MonitorConfig;
use crate::domain::position_tracker::DEFAULT_PORTFOLIO_FILE;
use crate::domain::safety_filter::FilterConfig;

/// Main configuration structure matching config/default.toml
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scanner: ScannerSection,
    pub filter: FilterConfig,
    pub monitor: MonitorSection,
    pub dexscreener: DexScreenerSection,
    pub storage: StorageSection,
    pub logging: LoggingSection,
    pub alerts: AlertsSection,
}

/// Scan command defaults
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScannerSection {
    /// Maximum number of ranked tokens to show
    pub limit: usize,
    /// Minimum composite score to show
    pub min_score: f64,
}

impl Default for ScannerSection {
    fn default() -> Self {
        Self {
            limit: 20,
            min_score: 0.0,
        }
    }
}

/// Position monitor timing
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorSection {
    /// Seconds between monitoring ticks
    pub interval_secs: u64,
    /// Minimum seconds between two alerts for the same position
    pub alert_cooldown_secs: u64,
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            alert_cooldown_secs: 300,
        }
    }
}

/// DexScreener API configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DexScreenerSection {
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    pub search_queries: Vec<String>,
    pub latest_limit: usize,
    pub per_query_limit: usize,
}

impl Default for DexScreenerSection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 10,
            search_queries: default_search_queries(),
            latest_limit: 100,
            per_query_limit: 30,
        }
    }
}

/// Where tracked positions are stored
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Portfolio JSON file; `~` is expanded
    pub portfolio_path: String,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            portfolio_path: format!("data/{}", DEFAULT_PORTFOLIO_FILE),
        }
    }
}

impl StorageSection {
    pub fn resolved_portfolio_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.portfolio_path).to_string())
    }
}

/// Logging configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

/// Alerts configuration section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AlertsSection {
    /// Enable Telegram notifications
    pub telegram_enabled: bool,
    /// Telegram bot token
    pub telegram_bot_token: String,
    /// Telegram chat ID
    pub telegram_chat_id: String,
    /// Telegram request timeout in seconds; 0 means 10
    pub timeout_secs: u64,
}

impl AlertsSection {
    /// Get bot token with environment variable override
    /// Checks TELEGRAM_BOT_TOKEN env var first, falls back to config value
    pub fn get_telegram_bot_token(&self) -> String {
        std::env::var("TELEGRAM_BOT_TOKEN").unwrap_or_else(|_| self.telegram_bot_token.clone())
    }

    /// Get chat id with environment variable override
    /// Checks TELEGRAM_CHAT_ID env var first, falls back to config value
    pub fn get_telegram_chat_id(&self) -> String {
        std::env::var("TELEGRAM_CHAT_ID").unwrap_or_else(|_| self.telegram_chat_id.clone())
    }

    pub fn timeout(&self) -> Duration {
        match self.timeout_secs {
            0 => Duration::from_secs(10),
            secs => Duration::from_secs(secs),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scanner.limit == 0 {
            return Err(ConfigError::ValidationError(
                "scanner.limit must be > 0".to_string(),
            ));
        }

        if !self.scanner.min_score.is_finite() || self.scanner.min_score < 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "scanner.min_score must be >= 0, got {}",
                self.scanner.min_score
            )));
        }

        if self.monitor.interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "monitor.interval_secs must be > 0".to_string(),
            ));
        }

        if self.dexscreener.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "dexscreener.base_url must not be empty".to_string(),
            ));
        }

        if self.dexscreener.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "dexscreener.timeout_secs must be > 0".to_string(),
            ));
        }

        if self.dexscreener.latest_limit == 0 && self.dexscreener.search_queries.is_empty() {
            return Err(ConfigError::ValidationError(
                "dexscreener needs latest_limit > 0 or at least one search query".to_string(),
            ));
        }

        if self.storage.portfolio_path.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "storage.portfolio_path must not be empty".to_string(),
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "logging.level must be one of {:?}, got {}",
                valid_levels, self.logging.level
            )));
        }

        if self.alerts.telegram_enabled
            && (self.alerts.get_telegram_bot_token().is_empty()
                || self.alerts.get_telegram_chat_id().is_empty())
        {
            return Err(ConfigError::ValidationError(
                "telegram_enabled requires telegram_bot_token and telegram_chat_id \
                 (or TELEGRAM_BOT_TOKEN / TELEGRAM_CHAT_ID)"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

impl From<&DexScreenerSection> for DexScreenerConfig {
    fn from(section: &DexScreenerSection) -> Self {
        Self {
            base_url: section.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(section.timeout_secs),
            search_queries: section.search_queries.clone(),
            latest_limit: section.latest_limit,
            per_query_limit: section.per_query_limit,
        }
    }
}

impl From<&MonitorSection> for MonitorConfig {
    fn from(section: &MonitorSection) -> Self {
        Self {
            interval: Duration::from_secs(section.interval_secs),
            alert_cooldown: Duration::from_secs(section.alert_cooldown_secs),
        }
    }
}
