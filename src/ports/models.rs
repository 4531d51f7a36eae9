//! Raw token records exchanged with market data sources
//!
//! `RawPair` mirrors the pair record served by DexScreener-style APIs. Numeric
//! fields arrive as numbers, numeric strings, or nulls depending on the
//! provider, so they are captured as `RawNumber` and resolved during the
//! conversion to a domain `Snapshot`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::domain::snapshot::{Snapshot, TxCount, TxWindows, Windows, DEFAULT_AGE_HOURS};

/// A leniently parsed numeric field
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RawNumber {
    /// Field absent or null
    #[default]
    Missing,
    /// Parsed value
    Value(f64),
    /// Present but not a number; holds the raw text
    Invalid(String),
}

impl RawNumber {
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => RawNumber::Missing,
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(v) => RawNumber::Value(v),
                None => RawNumber::Invalid(n.to_string()),
            },
            serde_json::Value::String(s) => match s.trim().parse::<f64>() {
                Ok(v) => RawNumber::Value(v),
                Err(_) => RawNumber::Invalid(s.clone()),
            },
            other => RawNumber::Invalid(other.to_string()),
        }
    }
}

impl From<f64> for RawNumber {
    fn from(value: f64) -> Self {
        RawNumber::Value(value)
    }
}

impl<'de> Deserialize<'de> for RawNumber {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(RawNumber::from_json(&value))
    }
}

impl Serialize for RawNumber {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            RawNumber::Missing => serializer.serialize_none(),
            RawNumber::Value(v) => serializer.serialize_f64(*v),
            RawNumber::Invalid(s) => serializer.serialize_str(s),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawBaseToken {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawLiquidity {
    #[serde(default)]
    pub usd: RawNumber,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawWindows {
    #[serde(default)]
    pub h1: RawNumber,
    #[serde(default)]
    pub h6: RawNumber,
    #[serde(default)]
    pub h24: RawNumber,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTxCount {
    #[serde(default)]
    pub buys: RawNumber,
    #[serde(default)]
    pub sells: RawNumber,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTxWindows {
    #[serde(default)]
    pub h1: Option<RawTxCount>,
    #[serde(default)]
    pub h6: Option<RawTxCount>,
    #[serde(default)]
    pub h24: Option<RawTxCount>,
}

/// Pair record as served by the market data provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPair {
    #[serde(default)]
    pub pair_address: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub base_token: Option<RawBaseToken>,
    #[serde(default)]
    pub price_usd: RawNumber,
    #[serde(default)]
    pub market_cap: RawNumber,
    #[serde(default)]
    pub fdv: RawNumber,
    #[serde(default)]
    pub liquidity: Option<RawLiquidity>,
    #[serde(default)]
    pub volume: Option<RawWindows>,
    #[serde(default)]
    pub price_change: Option<RawWindows>,
    #[serde(default)]
    pub txns: Option<RawTxWindows>,
    /// Pair creation time in Unix milliseconds
    #[serde(default)]
    pub pair_created_at: RawNumber,
}

/// Collects the names of fields that failed to parse
#[derive(Default)]
struct FieldReader {
    malformed: Vec<String>,
}

impl FieldReader {
    fn number(&mut self, name: &str, raw: &RawNumber) -> f64 {
        match raw {
            RawNumber::Missing => 0.0,
            RawNumber::Value(v) => *v,
            RawNumber::Invalid(_) => {
                self.malformed.push(name.to_string());
                0.0
            }
        }
    }

    fn count(&mut self, name: &str, raw: &RawNumber) -> u64 {
        match raw {
            RawNumber::Missing => 0,
            RawNumber::Value(v) if v.is_finite() && *v >= 0.0 => *v as u64,
            _ => {
                self.malformed.push(name.to_string());
                0
            }
        }
    }

    fn windows(&mut self, prefix: &str, raw: Option<&RawWindows>) -> Windows {
        match raw {
            Some(w) => Windows::new(
                self.number(&format!("{}.h1", prefix), &w.h1),
                self.number(&format!("{}.h6", prefix), &w.h6),
                self.number(&format!("{}.h24", prefix), &w.h24),
            ),
            None => Windows::default(),
        }
    }

    fn tx_count(&mut self, prefix: &str, raw: Option<&RawTxCount>) -> TxCount {
        match raw {
            Some(c) => TxCount::new(
                self.count(&format!("{}.buys", prefix), &c.buys),
                self.count(&format!("{}.sells", prefix), &c.sells),
            ),
            None => TxCount::default(),
        }
    }
}

impl RawPair {
    /// Token address, if the record carries one
    pub fn token_address(&self) -> Option<&str> {
        self.base_token.as_ref().and_then(|t| t.address.as_deref())
    }

    /// Convert to a domain snapshot.
    ///
    /// Missing fields default to 0 (age to 48h). Fields that are present but
    /// unparseable also default, and are listed in `Snapshot::malformed`.
    pub fn to_snapshot(&self, now: DateTime<Utc>) -> Snapshot {
        let mut reader = FieldReader::default();
        let base = self.base_token.clone().unwrap_or_default();

        let symbol = base.symbol.unwrap_or_else(|| "UNKNOWN".to_string());
        let address = base.address.unwrap_or_default();

        let price_usd = reader.number("price_usd", &self.price_usd);
        let market_cap = reader.number("market_cap", &self.market_cap);
        let fdv = reader.number("fdv", &self.fdv);
        let liquidity_usd = match &self.liquidity {
            Some(l) => reader.number("liquidity_usd", &l.usd),
            None => 0.0,
        };
        let volume = reader.windows("volume", self.volume.as_ref());
        let price_change_pct = reader.windows("price_change", self.price_change.as_ref());

        let txns = self.txns.clone().unwrap_or_default();
        let tx_counts = TxWindows {
            h1: reader.tx_count("txns.h1", txns.h1.as_ref()),
            h6: reader.tx_count("txns.h6", txns.h6.as_ref()),
            h24: reader.tx_count("txns.h24", txns.h24.as_ref()),
        };

        let age_hours = match &self.pair_created_at {
            RawNumber::Value(ms) if ms.is_finite() && *ms > 0.0 => {
                let now_ms = now.timestamp_millis() as f64;
                ((now_ms - ms) / 1000.0 / 3600.0).max(0.0)
            }
            RawNumber::Invalid(_) => {
                reader.malformed.push("pair_created_at".to_string());
                DEFAULT_AGE_HOURS
            }
            _ => DEFAULT_AGE_HOURS,
        };

        let mut snapshot = Snapshot {
            symbol,
            name: base.name.unwrap_or_default(),
            address,
            pair_address: self.pair_address.clone().unwrap_or_default(),
            dex_url: self.url.clone(),
            price_usd,
            market_cap,
            fdv,
            liquidity_usd,
            volume,
            price_change_pct,
            tx_counts,
            age_hours,
            malformed: reader.malformed,
        };
        snapshot.check_ranges();
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_raw_number_parsing() {
        assert_eq!(RawNumber::from_json(&serde_json::json!(12.5)), RawNumber::Value(12.5));
        assert_eq!(RawNumber::from_json(&serde_json::json!("0.0042")), RawNumber::Value(0.0042));
        assert_eq!(RawNumber::from_json(&serde_json::Value::Null), RawNumber::Missing);
        assert!(matches!(
            RawNumber::from_json(&serde_json::json!("n/a")),
            RawNumber::Invalid(_)
        ));
        assert!(matches!(
            RawNumber::from_json(&serde_json::json!([1, 2])),
            RawNumber::Invalid(_)
        ));
    }

    #[test]
    fn test_pair_to_snapshot() {
        let created_ms = now().timestamp_millis() - 2 * 3600 * 1000;
        let json = serde_json::json!({
            "pairAddress": "Pair111",
            "url": "https://dexscreener.com/solana/pair111",
            "baseToken": { "address": "Mint111", "name": "Doge Moon", "symbol": "DMOON" },
            "priceUsd": "0.00012",
            "marketCap": 50000,
            "fdv": 52000,
            "liquidity": { "usd": 10000 },
            "volume": { "h1": 1500, "h6": 6000, "h24": 20000 },
            "priceChange": { "h1": 3, "h6": 12, "h24": 40 },
            "txns": {
                "h1": { "buys": 20, "sells": 10 },
                "h6": { "buys": 80, "sells": 60 },
                "h24": { "buys": 300, "sells": 200 }
            },
            "pairCreatedAt": created_ms
        });

        let pair: RawPair = serde_json::from_value(json).unwrap();
        let snap = pair.to_snapshot(now());

        assert_eq!(snap.symbol, "DMOON");
        assert_eq!(snap.address, "Mint111");
        assert_eq!(snap.pair_address, "Pair111");
        assert_eq!(snap.price_usd, 0.00012);
        assert_eq!(snap.market_cap, 50_000.0);
        assert_eq!(snap.liquidity_usd, 10_000.0);
        assert_eq!(snap.volume.h24, 20_000.0);
        assert_eq!(snap.price_change_pct.h24, 40.0);
        assert_eq!(snap.tx_counts.h24, TxCount::new(300, 200));
        assert!((snap.age_hours - 2.0).abs() < 1e-9);
        assert!(!snap.is_malformed());
    }

    #[test]
    fn test_missing_fields_default() {
        let pair: RawPair = serde_json::from_value(serde_json::json!({
            "baseToken": { "address": "Mint222", "symbol": "CAT" },
            "liquidity": null
        }))
        .unwrap();
        let snap = pair.to_snapshot(now());

        assert_eq!(snap.market_cap, 0.0);
        assert_eq!(snap.liquidity_usd, 0.0);
        assert_eq!(snap.volume, Windows::default());
        assert_eq!(snap.age_hours, DEFAULT_AGE_HOURS);
        assert!(!snap.is_malformed());
    }

    #[test]
    fn test_unparseable_fields_are_recorded() {
        let pair: RawPair = serde_json::from_value(serde_json::json!({
            "baseToken": { "address": "Mint333", "symbol": "BAD" },
            "marketCap": "lots",
            "volume": { "h24": "??" },
            "txns": { "h24": { "buys": -4, "sells": 2 } },
            "pairCreatedAt": "yesterday"
        }))
        .unwrap();
        let snap = pair.to_snapshot(now());

        assert_eq!(snap.market_cap, 0.0);
        assert_eq!(snap.age_hours, DEFAULT_AGE_HOURS);
        assert!(snap.malformed.contains(&"market_cap".to_string()));
        assert!(snap.malformed.contains(&"volume.h24".to_string()));
        assert!(snap.malformed.contains(&"txns.h24.buys".to_string()));
        assert!(snap.malformed.contains(&"pair_created_at".to_string()));
    }

    #[test]
    fn test_future_creation_time_clamps_to_zero() {
        let pair = RawPair {
            pair_created_at: RawNumber::Value((now().timestamp_millis() + 60_000) as f64),
            ..Default::default()
        };
        let snap = pair.to_snapshot(now());
        assert_eq!(snap.age_hours, 0.0);
        assert_eq!(snap.symbol, "UNKNOWN");
    }

    #[test]
    fn test_token_address() {
        let pair: RawPair = serde_json::from_value(serde_json::json!({
            "baseToken": { "address": "Mint444" }
        }))
        .unwrap();
        assert_eq!(pair.token_address(), Some("Mint444"));
        assert_eq!(RawPair::default().token_address(), None);
    }
}
