//! memescope - Meme Coin Scanner and Position Monitor Library
//!
//! Screens fresh DEX pairs through a safety filter and a multi-factor score,
//! then watches tracked tokens for exit signals.
//!
//! # Modules
//!
//! - `domain`: Core logic (Snapshot, SafetyFilter, scorers, CompositeRanker, Position,
//!   exit signals)
//! - `ports`: Trait abstractions (SnapshotSource, AlertNotifier)
//! - `adapters`: External implementations (DexScreener, Telegram, CLI)
//! - `config`: Configuration loading and validation
//! - `application`: Scanner and position monitor use cases

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod config;
pub mod application;
