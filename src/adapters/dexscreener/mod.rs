//! DexScreener Market Data Adapter
//!
//! Implements `SnapshotSource` over the DexScreener REST API.

mod client;

pub use client::{
    dedupe_pairs, default_search_queries, DexScreenerClient, DexScreenerConfig, DEFAULT_BASE_URL,
};
