//! Adapters Layer - External System Implementations
//!
//! This module contains implementations of the port traits:
//! - DexScreener: token pair market data
//! - Notify: console and Telegram alert delivery
//! - CLI: Command-line interface handlers

pub mod dexscreener;
pub mod notify;
pub mod cli;

pub use dexscreener::{DexScreenerClient, DexScreenerConfig};
pub use notify::{LogNotifier, MultiNotifier, TelegramNotifier};
pub use cli::CliApp;
