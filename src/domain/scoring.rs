//! Component Scorers
//!
//! Four independent 0-10 scorers over a snapshot that already passed the
//! safety filter. Each one is a fixed step table; missing data lands on the
//! neutral row of the table rather than failing.
//!
//! A scorer only fails when an intermediate value is not finite, which can
//! happen with extreme but well-formed inputs (e.g. a ratio overflowing).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::snapshot::Snapshot;

/// Lower and upper bound of every component score
pub const SCORE_MIN: f64 = 0.0;
pub const SCORE_MAX: f64 = 10.0;

/// Quality ratio used when liquidity is unknown
const NO_LIQUIDITY_RATIO: f64 = 999.0;

/// Errors raised while scoring
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoringError {
    #[error("Non-finite {component} input: {value}")]
    NonFinite { component: &'static str, value: f64 },
}

/// The four component scores of a ranked snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentScores {
    pub volume: f64,
    pub price: f64,
    pub holder: f64,
    pub safety: f64,
}

impl ComponentScores {
    /// Compute all four scores, stopping at the first failure
    pub fn compute(snapshot: &Snapshot) -> Result<Self, ScoringError> {
        Ok(Self {
            volume: volume_score(snapshot)?,
            price: price_score(snapshot)?,
            holder: holder_score(snapshot)?,
            safety: safety_score(snapshot)?,
        })
    }

    pub fn average(&self) -> f64 {
        (self.volume + self.price + self.holder + self.safety) / 4.0
    }
}

fn finite(component: &'static str, value: f64) -> Result<f64, ScoringError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ScoringError::NonFinite { component, value })
    }
}

fn clamp_score(value: f64) -> f64 {
    value.clamp(SCORE_MIN, SCORE_MAX)
}

/// Volume and momentum score.
///
/// Weighted: acceleration 35%, buy pressure 25%, 6h growth 20%,
/// current activity 10%, volume quality 10%.
pub fn volume_score(snapshot: &Snapshot) -> Result<f64, ScoringError> {
    let v1h = finite("volume.h1", snapshot.volume.h1)?;
    let v6h = finite("volume.h6", snapshot.volume.h6)?;
    let v24h = finite("volume.h24", snapshot.volume.h24)?;
    let liquidity = finite("liquidity", snapshot.liquidity_usd)?;

    let hourly_from_6h = v6h / 6.0;
    let acceleration = if v1h > 0.0 && hourly_from_6h > 0.0 {
        let r = finite("acceleration ratio", v1h / hourly_from_6h)?;
        if r > 5.0 {
            10.0
        } else if r > 3.0 {
            9.0
        } else if r > 2.0 {
            8.0
        } else if r > 1.5 {
            6.0
        } else if r > 1.0 {
            4.0
        } else {
            2.0
        }
    } else {
        3.0
    };

    let buy = match snapshot.tx_counts.h24.buy_ratio() {
        Some(b) if b > 0.7 => 10.0,
        Some(b) if b > 0.6 => 8.0,
        Some(b) if b > 0.5 => 6.0,
        Some(b) if b > 0.4 => 4.0,
        Some(_) => 2.0,
        None => 5.0,
    };

    let g = if v24h > 0.0 {
        finite("growth ratio", v6h * 4.0 / v24h)?
    } else {
        0.0
    };
    let growth = if g > 3.0 {
        10.0
    } else if g > 2.0 {
        9.0
    } else if g > 1.5 {
        7.0
    } else if g > 1.0 {
        5.0
    } else if g > 0.5 {
        3.0
    } else {
        0.0
    };

    let a = if v24h > 0.0 {
        finite("activity ratio", v1h / (v24h / 24.0))?
    } else {
        0.0
    };
    let activity = if a > 5.0 {
        10.0
    } else if a > 3.0 {
        8.0
    } else if a > 2.0 {
        6.0
    } else if a > 1.0 {
        4.0
    } else {
        2.0
    };

    let q = if liquidity > 0.0 {
        finite("quality ratio", v24h / liquidity)?
    } else {
        NO_LIQUIDITY_RATIO
    };
    let quality = if q > 30.0 {
        1.0
    } else if q > 20.0 {
        3.0
    } else if q > 10.0 {
        5.0
    } else if q >= 2.0 {
        8.0
    } else if q >= 0.5 {
        6.0
    } else {
        3.0
    };

    let weighted =
        acceleration * 0.35 + buy * 0.25 + growth * 0.20 + activity * 0.10 + quality * 0.10;
    Ok(clamp_score(weighted))
}

/// Price pattern score: mean of the 1h, 6h and 24h tables, a higher-lows
/// pattern check and a volatility estimate.
pub fn price_score(snapshot: &Snapshot) -> Result<f64, ScoringError> {
    let p1h = finite("price_change.h1", snapshot.price_change_pct.h1)?;
    let p6h = finite("price_change.h6", snapshot.price_change_pct.h6)?;
    let p24h = finite("price_change.h24", snapshot.price_change_pct.h24)?;

    let score_1h = if p1h < -15.0 {
        0.0
    } else if p1h < -5.0 {
        1.0
    } else if p1h < 0.0 {
        3.0
    } else if p1h < 3.0 {
        5.0
    } else if p1h < 10.0 {
        7.0
    } else if p1h < 20.0 {
        9.0
    } else {
        10.0
    };

    // Over 100% in 6h is already a pump
    let score_6h = if p6h < -10.0 {
        0.0
    } else if p6h < 0.0 {
        2.0
    } else if p6h < 5.0 {
        4.0
    } else if p6h < 15.0 {
        6.0
    } else if p6h < 30.0 {
        8.0
    } else if p6h < 100.0 {
        10.0
    } else {
        7.0
    };

    let score_24h = if p24h < -10.0 {
        0.0
    } else if p24h < 0.0 {
        1.0
    } else if p24h < 5.0 {
        4.0
    } else if p24h < 20.0 {
        7.0
    } else if p24h < 100.0 {
        10.0
    } else if p24h < 300.0 {
        6.0
    } else {
        2.0
    };

    let higher_lows = p1h > -5.0 && p6h > p24h * 0.3;
    let pattern = if higher_lows { 10.0 } else { 0.0 };

    let v = finite(
        "volatility",
        p1h.abs() + (p6h - p1h).abs() + (p24h - p6h).abs(),
    )?;
    let volatility = if v > 100.0 {
        2.0
    } else if v > 80.0 {
        4.0
    } else if v > 60.0 {
        6.0
    } else if v > 40.0 {
        8.0
    } else {
        10.0
    };

    Ok(clamp_score(
        (score_1h + score_6h + score_24h + pattern + volatility) / 5.0,
    ))
}

/// Holder distribution proxy: liquidity depth relative to market cap,
/// 24h transaction count and buy/sell balance.
pub fn holder_score(snapshot: &Snapshot) -> Result<f64, ScoringError> {
    let liquidity = finite("liquidity", snapshot.liquidity_usd)?;
    let market_cap = finite("market_cap", snapshot.market_cap)?;

    let ratio = if market_cap > 0.0 {
        finite("liquidity ratio", liquidity / market_cap)?
    } else {
        0.0
    };
    let depth = if ratio > 0.3 {
        10.0
    } else if ratio > 0.2 {
        8.0
    } else if ratio > 0.1 {
        6.0
    } else if ratio > 0.05 {
        4.0
    } else {
        2.0
    };

    let txns = snapshot.tx_counts.h24;
    let activity = match txns.total() {
        t if t > 1000 => 10.0,
        t if t > 500 => 8.0,
        t if t > 200 => 6.0,
        t if t > 50 => 4.0,
        _ => 2.0,
    };

    let balance = match txns.buy_ratio() {
        Some(b) if (0.4..=0.6).contains(&b) => 10.0,
        Some(b) if (0.3..=0.7).contains(&b) => 7.0,
        Some(b) if (0.2..=0.8).contains(&b) => 5.0,
        Some(_) => 2.0,
        None => 0.0,
    };

    Ok(clamp_score((depth + activity + balance) / 3.0))
}

/// Safety and liquidity health: absolute liquidity, market cap band and
/// volume turnover.
pub fn safety_score(snapshot: &Snapshot) -> Result<f64, ScoringError> {
    let liquidity = finite("liquidity", snapshot.liquidity_usd)?;
    let market_cap = finite("market_cap", snapshot.market_cap)?;
    let v24h = finite("volume.h24", snapshot.volume.h24)?;

    let depth = if liquidity > 50_000.0 {
        10.0
    } else if liquidity > 25_000.0 {
        8.0
    } else if liquidity > 15_000.0 {
        6.0
    } else if liquidity > 10_000.0 {
        4.0
    } else {
        2.0
    };

    let band = if (1_000_000.0..=10_000_000.0).contains(&market_cap) {
        10.0
    } else if (500_000.0..=20_000_000.0).contains(&market_cap) {
        8.0
    } else if (100_000.0..=30_000_000.0).contains(&market_cap) {
        6.0
    } else {
        4.0
    };

    let turnover = if liquidity > 0.0 {
        finite("turnover", v24h / liquidity)?
    } else {
        0.0
    };
    let health = if (2.0..=8.0).contains(&turnover) {
        10.0
    } else if (1.0..=12.0).contains(&turnover) {
        7.0
    } else if (0.5..=15.0).contains(&turnover) {
        5.0
    } else {
        2.0
    };

    Ok(clamp_score((depth + band + health) / 3.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn create_bare_candidate() -> Snapshot {
        Snapshot::new("DMOON", "Mint111")
            .with_market_cap(50_000.0)
            .with_volume(0.0, 0.0, 20_000.0)
            .with_liquidity(10_000.0)
            .with_price_change(3.0, 0.0, 40.0)
            .with_age_hours(2.0)
    }

    fn create_active_candidate() -> Snapshot {
        create_bare_candidate()
            .with_volume(3_000.0, 8_000.0, 20_000.0)
            .with_price_change(3.0, 15.0, 40.0)
            .with_txns_24h(350, 150)
    }

    #[test]
    fn test_volume_score_without_window_data() {
        // accel 3, buy 5, growth 0, activity 2, quality 8
        let score = volume_score(&create_bare_candidate()).unwrap();
        assert_relative_eq!(score, 3.3, epsilon = 1e-9);
    }

    #[test]
    fn test_volume_score_active() {
        // accel 8, buy 8, growth 7, activity 8, quality 8
        let score = volume_score(&create_active_candidate()).unwrap();
        assert_relative_eq!(score, 7.8, epsilon = 1e-9);
    }

    #[test]
    fn test_volume_quality_without_liquidity() {
        let snap = create_bare_candidate().with_liquidity(0.0);
        // quality drops to 1 on the 999 ratio
        let score = volume_score(&snap).unwrap();
        assert_relative_eq!(score, 2.6, epsilon = 1e-9);
    }

    #[test]
    fn test_price_score() {
        // 7 + 4 + 10 + 0 + 8
        let score = price_score(&create_bare_candidate()).unwrap();
        assert_relative_eq!(score, 5.8, epsilon = 1e-9);

        // 7 + 8 + 10 + 10 + 10
        let score = price_score(&create_active_candidate()).unwrap();
        assert_relative_eq!(score, 9.0, epsilon = 1e-9);
    }

    #[test]
    fn test_price_score_penalizes_dump() {
        let snap = create_bare_candidate().with_price_change(-18.0, -12.0, -15.0);
        // 0 + 0 + 0 + 0 + volatility(18 + 6 + 3 = 27 -> 10)
        let score = price_score(&snap).unwrap();
        assert_relative_eq!(score, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_holder_score() {
        // depth 6 (ratio 0.2 is not > 0.2), txns 2, no txns balance 0
        let score = holder_score(&create_bare_candidate()).unwrap();
        assert_relative_eq!(score, 8.0 / 3.0, epsilon = 1e-9);

        // depth 6, txns 500 -> 6, ratio 0.7 -> 7
        let score = holder_score(&create_active_candidate()).unwrap();
        assert_relative_eq!(score, 19.0 / 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_holder_balanced_flow() {
        let snap = create_bare_candidate().with_txns_24h(600, 600);
        // depth 6, txns 10, balance 10
        let score = holder_score(&snap).unwrap();
        assert_relative_eq!(score, 26.0 / 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_safety_score() {
        // liquidity 2, band 4, turnover 2.0 -> 10
        let score = safety_score(&create_bare_candidate()).unwrap();
        assert_relative_eq!(score, 16.0 / 3.0, epsilon = 1e-9);

        let snap = create_bare_candidate()
            .with_liquidity(60_000.0)
            .with_market_cap(2_000_000.0)
            .with_volume(0.0, 0.0, 300_000.0);
        assert_relative_eq!(safety_score(&snap).unwrap(), 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_safety_uses_raw_market_cap() {
        let snap = create_bare_candidate()
            .with_market_cap(0.0)
            .with_fdv(2_000_000.0);
        // band falls back to 4 rather than scoring the FDV
        assert_relative_eq!(safety_score(&snap).unwrap(), 16.0 / 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_scores_stay_in_range() {
        let snaps = [
            create_bare_candidate(),
            create_active_candidate(),
            Snapshot::new("X", "x"),
            create_bare_candidate().with_price_change(500.0, 400.0, 1000.0),
        ];
        for snap in &snaps {
            let scores = ComponentScores::compute(snap).unwrap();
            for value in [scores.volume, scores.price, scores.holder, scores.safety] {
                assert!((SCORE_MIN..=SCORE_MAX).contains(&value));
            }
        }
    }

    #[test]
    fn test_overflowing_ratio_fails() {
        let snap = create_bare_candidate().with_volume(0.0, f64::MAX, 20_000.0);
        let err = volume_score(&snap).unwrap_err();
        assert!(matches!(
            err,
            ScoringError::NonFinite {
                component: "growth ratio",
                ..
            }
        ));
    }
}
