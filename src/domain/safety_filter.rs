//! Safety Filter
//!
//! Stage-1 admission gate of the scoring funnel. A snapshot either passes with
//! a short summary of its age and size, or is rejected with the first rule it
//! broke. Rejections are expected outcomes, not errors.
//!
//! Rules are checked in order:
//! 1. Malformed input (fail closed)
//! 2. Major asset exclusion
//! 3. Age window (15 minutes to 72 hours)
//! 4. Market cap band (only when known)
//! 5. Volume and liquidity floors
//! 6. Wash trading ratio
//! 7. Pump-and-dump patterns
//! 8. Meme lexical signals, with a metrics fallback

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::snapshot::{format_usd, Snapshot};

/// Minimum pair age in hours (15 minutes)
pub const MIN_AGE_HOURS: f64 = 0.25;

/// Maximum pair age in hours (3 days)
pub const MAX_AGE_HOURS: f64 = 72.0;

/// Sweet spot for early entries, inclusive bounds in hours
pub const SWEET_SPOT_HOURS: (f64, f64) = (1.0, 24.0);

/// Market cap floor (USD), applied only when a cap is known
pub const MIN_MARKET_CAP_USD: f64 = 1_000.0;

/// Market cap ceiling (USD), above this a token is too established
pub const MAX_MARKET_CAP_USD: f64 = 100_000_000.0;

pub const MIN_VOLUME_24H_USD: f64 = 1_000.0;

pub const MIN_LIQUIDITY_USD: f64 = 5_000.0;

/// 24h volume over liquidity above which volume is treated as wash trading
pub const MAX_VOLUME_LIQUIDITY_RATIO: f64 = 500.0;

/// Non-meme tokens need at least this market cap to pass
pub const NON_MEME_MIN_MARKET_CAP_USD: f64 = 10_000.0;

/// Symbols longer than this carry no meme signal by length alone
pub const MEME_SYMBOL_MAX_LEN: usize = 10;

/// Keyword lists used by the filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Symbols that are never candidates (exact, case-sensitive)
    pub major_assets: Vec<String>,
    /// Lowercase substrings matched against the token name
    pub name_keywords: Vec<String>,
    /// Lowercase substrings matched against the lowercased symbol
    pub symbol_keywords: Vec<String>,
    /// Suffixes matched against the symbol as given
    pub symbol_suffixes: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        fn owned(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }

        Self {
            major_assets: owned(&[
                "ETH", "BTC", "USDC", "USDT", "WETH", "DAI", "WBTC", "UNI", "LINK", "MATIC",
                "AVAX", "SOL", "ADA", "DOT", "ATOM", "TRX", "LTC",
            ]),
            name_keywords: owned(&[
                "dog", "cat", "pepe", "frog", "moon", "rocket", "inu", "shib", "meme", "ai",
                "bot", "coin", "token", "doge", "elon", "trump",
            ]),
            symbol_keywords: owned(&["ai", "bot", "inu", "coin", "doge"]),
            symbol_suffixes: owned(&["INU", "COIN"]),
        }
    }
}

/// Result of running a snapshot through the filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOutcome {
    pub passed: bool,
    pub reason: String,
}

impl FilterOutcome {
    fn pass(reason: String) -> Self {
        Self { passed: true, reason }
    }

    fn reject(reason: String) -> Self {
        Self {
            passed: false,
            reason,
        }
    }

    /// Reason text before the first ':', used to group rejections
    pub fn reason_key(&self) -> &str {
        match self.reason.split_once(':') {
            Some((key, _)) => key,
            None => &self.reason,
        }
    }
}

/// Stage-1 admission gate
#[derive(Debug, Clone)]
pub struct SafetyFilter {
    major_assets: HashSet<String>,
    name_keywords: Vec<String>,
    symbol_keywords: Vec<String>,
    symbol_suffixes: Vec<String>,
}

impl Default for SafetyFilter {
    fn default() -> Self {
        Self::new(FilterConfig::default())
    }
}

impl SafetyFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self {
            major_assets: config.major_assets.into_iter().collect(),
            name_keywords: config
                .name_keywords
                .into_iter()
                .map(|k| k.to_lowercase())
                .collect(),
            symbol_keywords: config
                .symbol_keywords
                .into_iter()
                .map(|k| k.to_lowercase())
                .collect(),
            symbol_suffixes: config.symbol_suffixes,
        }
    }

    /// Check a snapshot against every admission rule
    pub fn filter(&self, snapshot: &Snapshot) -> FilterOutcome {
        let malformed = snapshot.malformed_fields();
        if !malformed.is_empty() {
            return FilterOutcome::reject(format!("Malformed input: {}", malformed.join(", ")));
        }

        let symbol = snapshot.symbol.as_str();
        let age = snapshot.age_hours;
        let market_cap = snapshot.effective_market_cap();
        let volume_24h = snapshot.volume.h24;
        let liquidity = snapshot.liquidity_usd;
        let price_1h = snapshot.price_change_pct.h1;
        let price_24h = snapshot.price_change_pct.h24;

        if self.major_assets.contains(symbol) {
            return FilterOutcome::reject(format!("Skipping major cryptocurrency: {}", symbol));
        }

        if age < MIN_AGE_HOURS {
            return FilterOutcome::reject(format!(
                "Token too new: {:.1}h (potential honeypot)",
                age
            ));
        }
        if age > MAX_AGE_HOURS {
            return FilterOutcome::reject(format!(
                "Token too old: {:.1}h (missed opportunity)",
                age
            ));
        }

        if market_cap > 0.0 {
            if market_cap < MIN_MARKET_CAP_USD {
                return FilterOutcome::reject(format!(
                    "Market cap too small: {}",
                    format_usd(market_cap)
                ));
            }
            if market_cap > MAX_MARKET_CAP_USD {
                return FilterOutcome::reject(format!(
                    "Market cap too large: {}",
                    format_usd(market_cap)
                ));
            }
        }

        if volume_24h < MIN_VOLUME_24H_USD {
            return FilterOutcome::reject(format!("Volume too low: {}", format_usd(volume_24h)));
        }

        if liquidity < MIN_LIQUIDITY_USD {
            return FilterOutcome::reject(format!(
                "Liquidity too low: {}",
                format_usd(liquidity)
            ));
        }

        if let Some(ratio) = snapshot.volume_liquidity_ratio() {
            if ratio > MAX_VOLUME_LIQUIDITY_RATIO {
                return FilterOutcome::reject(format!(
                    "Extreme volume/liquidity ratio: {:.1}",
                    ratio
                ));
            }
        }

        if price_24h > 200.0 && price_1h < -5.0 {
            return FilterOutcome::reject(format!(
                "Already pumped (+{:.0}%) and dumping ({:.1}% 1h)",
                price_24h, price_1h
            ));
        }

        if price_1h < -20.0 {
            return FilterOutcome::reject(format!("Heavy dumping: {:.1}% in 1h", price_1h));
        }

        if !self.has_meme_signals(snapshot)
            && (volume_24h < MIN_VOLUME_24H_USD || market_cap < NON_MEME_MIN_MARKET_CAP_USD)
        {
            return FilterOutcome::reject(format!(
                "Not clearly a meme token and low metrics: {}",
                symbol
            ));
        }

        let age_info = if age < 48.0 {
            format!("{:.1}h", age)
        } else {
            format!("{:.1}d", age / 24.0)
        };
        let sweet_spot_tag = if is_sweet_spot(age) { " [EARLY!]" } else { "" };

        FilterOutcome::pass(format!(
            "Passed filter (Age: {}{}, MC: {}, Vol: {})",
            age_info,
            sweet_spot_tag,
            format_usd(market_cap),
            format_usd(volume_24h)
        ))
    }

    /// Whether the symbol or name looks like a meme token.
    ///
    /// An empty symbol never qualifies.
    pub fn has_meme_signals(&self, snapshot: &Snapshot) -> bool {
        let symbol = snapshot.symbol.as_str();
        let first = match symbol.chars().next() {
            Some(c) => c,
            None => return false,
        };

        let name = snapshot.name.to_lowercase();
        let symbol_lower = symbol.to_lowercase();

        symbol.chars().count() <= MEME_SYMBOL_MAX_LEN
            || self.name_keywords.iter().any(|k| name.contains(k.as_str()))
            || self
                .symbol_keywords
                .iter()
                .any(|k| symbol_lower.contains(k.as_str()))
            || self
                .symbol_suffixes
                .iter()
                .any(|s| symbol.ends_with(s.as_str()))
            || symbol.chars().any(|c| c.is_ascii_digit())
            || symbol.chars().filter(|c| *c == first).count() > 1
    }
}

/// Age between 1 and 24 hours inclusive
pub fn is_sweet_spot(age_hours: f64) -> bool {
    (SWEET_SPOT_HOURS.0..=SWEET_SPOT_HOURS.1).contains(&age_hours)
}
