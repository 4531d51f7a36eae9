//! Token Snapshot
//!
//! Normalized, read-only view of one token's market state at a point in time.
//! Every stage of the scoring funnel and the exit-signal evaluator reads from
//! this type; the conversion from raw records (see `ports::models::RawPair`)
//! is the single place where defaults are applied.

use serde::{Deserialize, Serialize};

/// Age assumed when the pair creation time is unknown
pub const DEFAULT_AGE_HOURS: f64 = 48.0;

/// A value sampled over the 1h / 6h / 24h windows
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Windows {
    pub h1: f64,
    pub h6: f64,
    pub h24: f64,
}

impl Windows {
    pub fn new(h1: f64, h6: f64, h24: f64) -> Self {
        Self { h1, h6, h24 }
    }
}

/// Buy/sell transaction counts for one window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxCount {
    pub buys: u64,
    pub sells: u64,
}

impl TxCount {
    pub fn new(buys: u64, sells: u64) -> Self {
        Self { buys, sells }
    }

    pub fn total(&self) -> u64 {
        self.buys + self.sells
    }

    /// Share of buys in the window, `None` when there were no transactions
    pub fn buy_ratio(&self) -> Option<f64> {
        let total = self.total();
        if total == 0 {
            None
        } else {
            Some(self.buys as f64 / total as f64)
        }
    }
}

/// Transaction counts over the 1h / 6h / 24h windows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxWindows {
    pub h1: TxCount,
    pub h6: TxCount,
    pub h24: TxCount,
}

/// One point-in-time market read for a token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Token symbol (e.g. "BONK")
    pub symbol: String,
    /// Token name, used for meme keyword matching
    #[serde(default)]
    pub name: String,
    /// Token address, the stable identity key
    pub address: String,
    /// Pool/pair address the data was read from
    #[serde(default)]
    pub pair_address: String,
    /// Link to the pair on the data provider
    #[serde(default)]
    pub dex_url: Option<String>,
    /// Spot price in USD
    #[serde(default)]
    pub price_usd: f64,
    pub market_cap: f64,
    /// Fully diluted valuation, used when `market_cap` is 0
    pub fdv: f64,
    pub liquidity_usd: f64,
    pub volume: Windows,
    /// Signed percent change per window
    pub price_change_pct: Windows,
    pub tx_counts: TxWindows,
    /// Hours since the pair was created
    pub age_hours: f64,
    /// Names of fields that failed to parse or violated their range
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub malformed: Vec<String>,
}

impl Snapshot {
    /// Create an empty snapshot for a token; every metric starts at its default
    pub fn new(symbol: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            name: String::new(),
            address: address.into(),
            pair_address: String::new(),
            dex_url: None,
            price_usd: 0.0,
            market_cap: 0.0,
            fdv: 0.0,
            liquidity_usd: 0.0,
            volume: Windows::default(),
            price_change_pct: Windows::default(),
            tx_counts: TxWindows::default(),
            age_hours: DEFAULT_AGE_HOURS,
            malformed: Vec::new(),
        }
    }

    /// Market cap, falling back to FDV when the market cap is unknown
    pub fn effective_market_cap(&self) -> f64 {
        if self.market_cap == 0.0 && self.fdv > 0.0 {
            self.fdv
        } else {
            self.market_cap
        }
    }

    /// 24h volume over liquidity, `None` without liquidity
    pub fn volume_liquidity_ratio(&self) -> Option<f64> {
        if self.liquidity_usd > 0.0 {
            Some(self.volume.h24 / self.liquidity_usd)
        } else {
            None
        }
    }

    /// True when a field failed to parse or a value is out of range
    pub fn is_malformed(&self) -> bool {
        !self.malformed.is_empty() || !self.range_violations().is_empty()
    }

    /// Names of fields that break the range invariants.
    ///
    /// Monetary and volume fields must be finite and non-negative, price
    /// changes finite, age finite and non-negative.
    pub fn range_violations(&self) -> Vec<String> {
        let non_negative = [
            ("price_usd", self.price_usd),
            ("market_cap", self.market_cap),
            ("fdv", self.fdv),
            ("liquidity_usd", self.liquidity_usd),
            ("volume.h1", self.volume.h1),
            ("volume.h6", self.volume.h6),
            ("volume.h24", self.volume.h24),
            ("age_hours", self.age_hours),
        ];
        let signed = [
            ("price_change.h1", self.price_change_pct.h1),
            ("price_change.h6", self.price_change_pct.h6),
            ("price_change.h24", self.price_change_pct.h24),
        ];

        non_negative
            .iter()
            .filter(|(_, v)| !v.is_finite() || *v < 0.0)
            .chain(signed.iter().filter(|(_, v)| !v.is_finite()))
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// Every malformed field name: parse failures first, then range violations
    pub fn malformed_fields(&self) -> Vec<String> {
        let mut fields = self.malformed.clone();
        for name in self.range_violations() {
            if !fields.contains(&name) {
                fields.push(name);
            }
        }
        fields
    }

    /// Record range violations in `malformed`
    pub fn check_ranges(&mut self) {
        self.malformed = self.malformed_fields();
    }

    // Builder helpers, mostly for fixtures and adapters

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_market_cap(mut self, market_cap: f64) -> Self {
        self.market_cap = market_cap;
        self
    }

    pub fn with_fdv(mut self, fdv: f64) -> Self {
        self.fdv = fdv;
        self
    }

    pub fn with_liquidity(mut self, liquidity_usd: f64) -> Self {
        self.liquidity_usd = liquidity_usd;
        self
    }

    pub fn with_volume(mut self, h1: f64, h6: f64, h24: f64) -> Self {
        self.volume = Windows::new(h1, h6, h24);
        self
    }

    pub fn with_price_change(mut self, h1: f64, h6: f64, h24: f64) -> Self {
        self.price_change_pct = Windows::new(h1, h6, h24);
        self
    }

    pub fn with_txns_24h(mut self, buys: u64, sells: u64) -> Self {
        self.tx_counts.h24 = TxCount::new(buys, sells);
        self
    }

    pub fn with_txns_6h(mut self, buys: u64, sells: u64) -> Self {
        self.tx_counts.h6 = TxCount::new(buys, sells);
        self
    }

    pub fn with_age_hours(mut self, age_hours: f64) -> Self {
        self.age_hours = age_hours;
        self
    }
}

/// Format a dollar amount with thousands separators and no decimals ("$50,000")
pub fn format_usd(value: f64) -> String {
    if !value.is_finite() {
        return format!("${}", value);
    }
    let rounded = value.abs().round() as u128;
    let digits = rounded.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 2);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if value < 0.0 && rounded > 0 {
        format!("-${}", out)
    } else {
        format!("${}", out)
    }
}
