//! CLI Command Handlers
//!
//! Implementation of all CLI commands for memescope.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::RwLock;

use crate::adapters::dexscreener::{DexScreenerClient, DexScreenerConfig};
use crate::adapters::notify::{LogNotifier, MultiNotifier, TelegramNotifier};
use crate::application::monitor::{MonitorConfig, MonitorEvent, PositionMonitor};
use crate::application::scanner::{ScanReport, Scanner};
use crate::config::{load_config, Config};
use crate::domain::position::Position;
use crate::domain::position_tracker::{PositionTracker, TrackerError};
use crate::domain::ranker::CompositeRanker;
use crate::domain::safety_filter::SafetyFilter;
use crate::domain::snapshot::format_usd;
use crate::ports::market_data::SnapshotSource;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// memescope - Meme coin scanner and position monitor
#[derive(Parser, Debug)]
#[command(
    name = "memescope",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "Meme coin scanner and position monitor",
    long_about = "memescope screens fresh DEX pairs through a safety filter and a \
                  multi-factor score, then watches tracked tokens for exit signals."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG_PATH, global = true)]
    pub config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan fresh pairs and rank the candidates
    Scan(ScanCmd),

    /// Start tracking a token
    Track(TrackCmd),

    /// Stop tracking a position
    Untrack(UntrackCmd),

    /// Show tracked positions
    Portfolio(PortfolioCmd),

    /// Show alerts
    Alerts(AlertsCmd),

    /// Acknowledge an alert
    Ack(AckCmd),

    /// Watch tracked positions for exit signals
    Monitor(MonitorCmd),
}

/// Scan and rank candidates
#[derive(Parser, Debug)]
pub struct ScanCmd {
    /// Maximum number of results (default: from config)
    #[arg(short, long, value_name = "N")]
    pub limit: Option<usize>,

    /// Minimum composite score (default: from config)
    #[arg(short, long, value_name = "SCORE")]
    pub min_score: Option<f64>,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,
}

/// Track a token
#[derive(Parser, Debug)]
pub struct TrackCmd {
    /// Token address
    #[arg(value_name = "ADDRESS")]
    pub address: String,

    /// Amount invested, for the record
    #[arg(short, long, value_name = "AMOUNT", default_value = "0")]
    pub amount: f64,
}

/// Untrack a position
#[derive(Parser, Debug)]
pub struct UntrackCmd {
    /// Position id
    #[arg(value_name = "ID")]
    pub id: String,
}

/// Show tracked positions
#[derive(Parser, Debug)]
pub struct PortfolioCmd {
    /// Print positions as JSON
    #[arg(long)]
    pub json: bool,
}

/// Show alerts
#[derive(Parser, Debug)]
pub struct AlertsCmd {
    /// Include acknowledged alerts
    #[arg(short, long)]
    pub all: bool,
}

/// Acknowledge an alert
#[derive(Parser, Debug)]
pub struct AckCmd {
    /// Alert id
    #[arg(value_name = "ALERT_ID")]
    pub alert_id: String,
}

/// Watch tracked positions
#[derive(Parser, Debug)]
pub struct MonitorCmd {
    /// Run a single tick and exit
    #[arg(long)]
    pub once: bool,
}

/// Execute the CLI command
pub async fn execute(app: CliApp) -> Result<()> {
    let config = resolve_config(&app.config)?;
    init_logging(app.verbose, app.debug, &config.logging.level)?;

    match app.command {
        Command::Scan(cmd) => scan_command(cmd, &config).await,
        Command::Track(cmd) => track_command(cmd, &config).await,
        Command::Untrack(cmd) => untrack_command(cmd, &config),
        Command::Portfolio(cmd) => portfolio_command(cmd, &config),
        Command::Alerts(cmd) => alerts_command(cmd, &config),
        Command::Ack(cmd) => ack_command(cmd, &config),
        Command::Monitor(cmd) => monitor_command(cmd, &config).await,
    }
}

/// Load the config file; a missing default file means built-in defaults
fn resolve_config(path: &Path) -> Result<Config> {
    if !path.exists() && path == Path::new(DEFAULT_CONFIG_PATH) {
        return Ok(Config::default());
    }
    load_config(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

/// Initialize logging system
fn init_logging(verbose: bool, debug: bool, config_level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        config_level
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

fn build_ranker(config: &Config) -> CompositeRanker {
    CompositeRanker::new(SafetyFilter::new(config.filter.clone()))
}

fn build_source(config: &Config) -> Result<Arc<DexScreenerClient>> {
    let client = DexScreenerClient::with_config(DexScreenerConfig::from(&config.dexscreener))
        .context("Failed to create DexScreener client")?;
    Ok(Arc::new(client))
}

fn open_tracker(config: &Config) -> Result<PositionTracker> {
    let path = config.storage.resolved_portfolio_path();
    PositionTracker::open(&path)
        .with_context(|| format!("Failed to open portfolio at {}", path.display()))
}

/// Handle scan command
async fn scan_command(cmd: ScanCmd, config: &Config) -> Result<()> {
    let limit = cmd.limit.unwrap_or(config.scanner.limit);
    let min_score = cmd.min_score.unwrap_or(config.scanner.min_score);

    tracing::info!("Scanning (limit {}, min score {:.1})", limit, min_score);

    let scanner = Scanner::new(build_source(config)?, build_ranker(config));
    let report = scanner.scan(limit, min_score).await.context("Scan failed")?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&report.results)?);
    } else {
        print_scan_report(&report);
    }
    Ok(())
}

fn print_scan_report(report: &ScanReport) {
    println!(
        "Scanned {} candidates: {} passed filter, {} analyzed",
        report.candidates, report.passed, report.analyzed
    );
    if report.results.is_empty() {
        println!("No tokens met the criteria.");
        return;
    }

    println!();
    println!(
        "{:>3}  {:<12} {:>6} {:>12} {:>12} {:>8}  {}",
        "#", "SYMBOL", "SCORE", "MCAP", "VOL 24H", "CHECK", "ADDRESS"
    );
    for (i, result) in report.results.iter().enumerate() {
        let (mcap, volume) = result
            .key_metrics
            .map(|m| (format_usd(m.market_cap), format_usd(m.volume_24h)))
            .unwrap_or_default();
        println!(
            "{:>3}  {:<12} {:>6.2} {:>12} {:>12} {:>6}m  {}",
            i + 1,
            result.symbol,
            result.final_score,
            mcap,
            volume,
            result.next_check_minutes,
            result.address
        );
        for flag in &result.risk_flags {
            println!("       ! {}", flag.message());
        }
    }
}

/// Handle track command
async fn track_command(cmd: TrackCmd, config: &Config) -> Result<()> {
    if cmd.amount < 0.0 || !cmd.amount.is_finite() {
        bail!("Amount must be a non-negative number, got {}", cmd.amount);
    }

    let source = build_source(config)?;
    let snapshot = source
        .fetch_snapshot(&cmd.address)
        .await
        .with_context(|| format!("Failed to fetch {}", cmd.address))?
        .with_context(|| format!("No pair listed for {}", cmd.address))?;

    let score = build_ranker(config).rank(&snapshot);
    if !score.is_analyzed() {
        tracing::warn!(
            "{} is {} ({}); tracking anyway",
            snapshot.symbol,
            score.status,
            score.reason.as_deref().unwrap_or("no reason")
        );
    }

    let mut tracker = open_tracker(config)?;
    let position = tracker
        .create(snapshot, &score, cmd.amount)
        .context("Failed to start tracking")?;

    println!("Tracking {} ({})", position.symbol, position.address);
    println!("  Position id: {}", position.id);
    println!("  Entry score: {:.2} ({})", position.entry_score.final_score, score.status);
    println!(
        "  Entry market cap: {}",
        format_usd(position.entry_snapshot.market_cap)
    );
    Ok(())
}

/// Handle untrack command
fn untrack_command(cmd: UntrackCmd, config: &Config) -> Result<()> {
    let mut tracker = open_tracker(config)?;
    if !tracker.remove(&cmd.id) {
        return Err(TrackerError::NotFound(cmd.id).into());
    }
    println!("Stopped tracking {}", cmd.id);
    Ok(())
}

/// Handle portfolio command
fn portfolio_command(cmd: PortfolioCmd, config: &Config) -> Result<()> {
    let tracker = open_tracker(config)?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(tracker.list())?);
        return Ok(());
    }

    let summary = tracker.summary();
    println!(
        "Positions: {} (watching {}, profit {}, danger {}, exited {})",
        summary.total, summary.watching, summary.profit, summary.danger, summary.exited
    );
    println!(
        "Average P/L: {:+.2}%  Active alerts: {}",
        summary.avg_profit_pct, summary.active_alerts
    );

    if !tracker.is_empty() {
        println!();
        for position in tracker.list() {
            print_position(position);
        }
    }
    Ok(())
}

fn print_position(position: &Position) {
    let action = position
        .last_action
        .map(|a| a.to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{:<10} {:<8} P/L {:+7.1}%  peak {:+7.1}%  held {:<8} {:<11} {}",
        position.symbol,
        position.status.to_string(),
        position.profit_loss_pct,
        position.peak_profit_pct,
        position.time_held_display(),
        action,
        position.id
    );
}

/// Handle alerts command
fn alerts_command(cmd: AlertsCmd, config: &Config) -> Result<()> {
    let tracker = open_tracker(config)?;
    let alerts: Vec<_> = if cmd.all {
        tracker.alerts().iter().collect()
    } else {
        tracker.active_alerts()
    };

    if alerts.is_empty() {
        println!("No alerts.");
        return Ok(());
    }

    for alert in alerts {
        let symbol = tracker
            .get(&alert.investment_id)
            .map(|p| p.symbol.as_str())
            .unwrap_or("?");
        println!(
            "{} [{}] {} {}{}",
            alert.timestamp.format("%Y-%m-%d %H:%M:%S"),
            alert.urgency,
            alert.alert_type,
            symbol,
            if alert.acknowledged { " (ack)" } else { "" }
        );
        println!("    {}", alert.message);
        println!("    id: {}", alert.id);
    }
    Ok(())
}

/// Handle ack command
fn ack_command(cmd: AckCmd, config: &Config) -> Result<()> {
    let mut tracker = open_tracker(config)?;
    if !tracker.acknowledge_alert(&cmd.alert_id) {
        bail!("Alert not found: {}", cmd.alert_id);
    }
    println!("Acknowledged {}", cmd.alert_id);
    Ok(())
}

fn build_notifier(config: &Config) -> Result<MultiNotifier> {
    let mut notifier = MultiNotifier::new().with(Arc::new(LogNotifier::new()));

    if config.alerts.telegram_enabled {
        let telegram = TelegramNotifier::new(
            config.alerts.get_telegram_bot_token(),
            config.alerts.get_telegram_chat_id(),
            config.alerts.timeout(),
        )
        .context("Failed to create Telegram notifier")?;
        notifier = notifier.with(Arc::new(telegram));
    }
    Ok(notifier)
}

/// Handle monitor command
async fn monitor_command(cmd: MonitorCmd, config: &Config) -> Result<()> {
    let tracker = Arc::new(RwLock::new(open_tracker(config)?));
    let notifier = build_notifier(config)?;
    tracing::info!("Alert channels: {}", notifier.channel_names().join(", "));

    let monitor = PositionMonitor::new(
        tracker,
        build_source(config)?,
        build_ranker(config),
        Arc::new(notifier),
    )
    .with_config(MonitorConfig::from(&config.monitor));

    if cmd.once {
        let report = monitor.tick().await;
        println!(
            "Checked {} positions: {} updated, {} alerts, {} failures",
            report.checked, report.updated, report.alerts, report.failures
        );
        return Ok(());
    }

    let mut events = monitor.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let MonitorEvent::PositionUpdated { position, action } = event {
                println!(
                    "{:<10} {:<11} P/L {:+7.1}%  {}",
                    position.symbol,
                    action.to_string(),
                    position.profit_loss_pct,
                    position.status
                );
            }
        }
    });

    // Setup Ctrl+C handler
    let handle = monitor.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Shutdown signal received");
        handle.stop().await;
    });

    monitor.run().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scan() {
        let app = CliApp::try_parse_from(["memescope", "scan", "--limit", "5", "--json"]).unwrap();
        assert_eq!(app.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        match app.command {
            Command::Scan(cmd) => {
                assert_eq!(cmd.limit, Some(5));
                assert_eq!(cmd.min_score, None);
                assert!(cmd.json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_track_with_global_flags() {
        let app = CliApp::try_parse_from([
            "memescope",
            "track",
            "Mint111",
            "--amount",
            "250",
            "--config",
            "custom.toml",
            "-v",
        ])
        .unwrap();
        assert!(app.verbose);
        assert_eq!(app.config, PathBuf::from("custom.toml"));
        match app.command {
            Command::Track(cmd) => {
                assert_eq!(cmd.address, "Mint111");
                assert_eq!(cmd.amount, 250.0);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_requires_ids() {
        assert!(CliApp::try_parse_from(["memescope", "untrack"]).is_err());
        assert!(CliApp::try_parse_from(["memescope", "ack"]).is_err());
        assert!(CliApp::try_parse_from(["memescope", "monitor", "--once"]).is_ok());
    }

    #[test]
    fn test_missing_default_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(resolve_config(&missing).is_err());

        // Only the default path may be absent
        if !Path::new(DEFAULT_CONFIG_PATH).exists() {
            assert!(resolve_config(Path::new(DEFAULT_CONFIG_PATH)).is_ok());
        }
    }
}
