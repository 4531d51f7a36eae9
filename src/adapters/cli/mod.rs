//! CLI Adapter
//!
//! Command-line interface for memescope.
//! Uses clap derive macros for argument parsing.

mod commands;

pub use commands::{
    AckCmd, AlertsCmd, CliApp, Command, MonitorCmd, PortfolioCmd, ScanCmd, TrackCmd, UntrackCmd,
};

use anyhow::Result;

/// Execute the CLI command
pub async fn execute(app: CliApp) -> Result<()> {
    commands::execute(app).await
}
