//! DexScreener API Client
//!
//! HTTP client for the public DexScreener API. Candidates come from the
//! latest-pairs feed plus a list of search queries; live snapshots come from
//! the token endpoint, first listed pair.
//!
//! Individual feed failures are logged and skipped. Requests are not retried.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde::Deserialize;

use crate::domain::snapshot::Snapshot;
use crate::ports::market_data::{SnapshotSource, SnapshotSourceError};
use crate::ports::models::RawPair;

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.dexscreener.com/latest";

/// Searches run concurrently, in batches of this size
const SEARCH_CONCURRENCY: usize = 4;

/// DexScreener client configuration
#[derive(Debug, Clone)]
pub struct DexScreenerConfig {
    /// Base URL, without trailing slash
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Search queries used to discover candidates
    pub search_queries: Vec<String>,
    /// Pairs kept from the latest-pairs feed
    pub latest_limit: usize,
    /// Pairs kept per search query
    pub per_query_limit: usize,
}

impl Default for DexScreenerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
            search_queries: default_search_queries(),
            latest_limit: 100,
            per_query_limit: 30,
        }
    }
}

/// Queries that surface fresh meme launches
pub fn default_search_queries() -> Vec<String> {
    [
        "solana meme",
        "sol meme",
        "pump.fun",
        "raydium",
        "solana new",
        "sol pump",
        "bonk",
        "wif",
        "base meme",
        "base new",
        "meme new",
        "launched today",
        "trending now",
        "moonshot",
        "gem",
        "new token",
        "fair launch",
        "stealth launch",
        "degen",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Deserialize)]
struct PairsResponse {
    #[serde(default)]
    pairs: Option<Vec<RawPair>>,
}

/// DexScreener HTTP client
#[derive(Debug, Clone)]
pub struct DexScreenerClient {
    config: DexScreenerConfig,
    http: Client,
}

impl DexScreenerClient {
    /// Create a client with default configuration
    pub fn new() -> Result<Self, SnapshotSourceError> {
        Self::with_config(DexScreenerConfig::default())
    }

    /// Create a client with custom configuration
    pub fn with_config(config: DexScreenerConfig) -> Result<Self, SnapshotSourceError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                SnapshotSourceError::RequestError(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { config, http })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Newest pairs across all chains
    pub async fn latest_pairs(&self) -> Result<Vec<RawPair>, SnapshotSourceError> {
        let url = format!("{}/dex/pairs/latest", self.config.base_url);
        let mut pairs = self.get_pairs(&url, &[]).await?;
        pairs.truncate(self.config.latest_limit);
        Ok(pairs)
    }

    /// Pairs matching a free-text query
    pub async fn search(&self, query: &str) -> Result<Vec<RawPair>, SnapshotSourceError> {
        let url = format!("{}/dex/search", self.config.base_url);
        let mut pairs = self.get_pairs(&url, &[("q", query)]).await?;
        pairs.truncate(self.config.per_query_limit);
        Ok(pairs)
    }

    /// All pairs listed for a token address
    pub async fn token_pairs(&self, address: &str) -> Result<Vec<RawPair>, SnapshotSourceError> {
        let url = format!("{}/dex/tokens/{}", self.config.base_url, address);
        self.get_pairs(&url, &[]).await
    }

    async fn get_pairs(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<RawPair>, SnapshotSourceError> {
        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SnapshotSourceError::Timeout(url.to_string())
                } else {
                    SnapshotSourceError::RequestError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SnapshotSourceError::StatusError {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body: PairsResponse = response
            .json()
            .await
            .map_err(|e| SnapshotSourceError::ParseError(e.to_string()))?;

        Ok(body.pairs.unwrap_or_default())
    }
}

/// Drop pairs without an address and repeats of an address already seen
pub fn dedupe_pairs(pairs: Vec<RawPair>) -> Vec<RawPair> {
    let mut seen = HashSet::new();
    pairs
        .into_iter()
        .filter(|pair| match pair.pair_address.as_deref() {
            Some(address) if !address.is_empty() => seen.insert(address.to_string()),
            _ => false,
        })
        .collect()
}

#[async_trait]
impl SnapshotSource for DexScreenerClient {
    async fn fetch_candidates(&self) -> Result<Vec<Snapshot>, SnapshotSourceError> {
        let mut all_pairs = Vec::new();
        let mut last_error = None;
        let mut succeeded = 0usize;

        match self.latest_pairs().await {
            Ok(pairs) => {
                tracing::info!("Found {} latest pairs", pairs.len());
                succeeded += 1;
                all_pairs.extend(pairs);
            }
            Err(e) => {
                tracing::warn!("Latest pairs feed failed: {}", e);
                last_error = Some(e);
            }
        }

        let results: Vec<(String, Result<Vec<RawPair>, SnapshotSourceError>)> =
            stream::iter(self.config.search_queries.iter().cloned())
                .map(|query| async move {
                    let result = self.search(&query).await;
                    (query, result)
                })
                .buffered(SEARCH_CONCURRENCY)
                .collect()
                .await;

        for (query, result) in results {
            match result {
                Ok(pairs) => {
                    tracing::debug!("Found {} pairs for query '{}'", pairs.len(), query);
                    succeeded += 1;
                    all_pairs.extend(pairs);
                }
                Err(e) => {
                    tracing::warn!("Search failed for '{}': {}", query, e);
                    last_error = Some(e);
                }
            }
        }

        if succeeded == 0 {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        let total = all_pairs.len();
        let unique = dedupe_pairs(all_pairs);
        tracing::info!("Fetched {} pairs, {} unique", total, unique.len());

        let now = Utc::now();
        Ok(unique.iter().map(|pair| pair.to_snapshot(now)).collect())
    }

    async fn fetch_snapshot(&self, address: &str) -> Result<Option<Snapshot>, SnapshotSourceError> {
        let pairs = self.token_pairs(address).await?;
        Ok(pairs.first().map(|pair| pair.to_snapshot(Utc::now())))
    }

    fn name(&self) -> &str {
        "dexscreener"
    }
}
