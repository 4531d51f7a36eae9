//! memescope - Meme Coin Scanner and Position Monitor
//!
//! Ranks fresh DEX pairs and alerts on exit signals for tracked tokens.

use anyhow::Result;
use clap::Parser;

use memescope::adapters::cli::{self, CliApp};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (secrets go here, not in the config file)
    dotenvy::dotenv().ok();

    let app = CliApp::parse();
    cli::execute(app).await
}
