//! Composite Ranker
//!
//! Final stage of the scoring funnel: runs the safety filter, the four
//! component scorers and the age bonus, and produces a `ScoreResult`.
//! Filter rejections and scoring failures come back as distinct statuses so
//! one bad snapshot never aborts a batch.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::safety_filter::SafetyFilter;
use super::scoring::{ComponentScores, SCORE_MAX};
use super::snapshot::Snapshot;

/// Re-check interval for rejected, failed or weak candidates
pub const SLOWEST_CHECK_MINUTES: u32 = 240;

/// Outcome class of a ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScoreStatus {
    /// Failed the safety filter
    Rejected,
    /// Fully scored
    Analyzed,
    /// Scoring raised an error
    Error,
}

impl fmt::Display for ScoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreStatus::Rejected => write!(f, "REJECTED"),
            ScoreStatus::Analyzed => write!(f, "ANALYZED"),
            ScoreStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Weak component warnings attached to an analyzed result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskFlag {
    LowVolumeActivity,
    PoorPriceMomentum,
    ConcentratedOwnership,
    SafetyConcerns,
}

impl RiskFlag {
    pub fn message(&self) -> &'static str {
        match self {
            RiskFlag::LowVolumeActivity => "Low volume activity",
            RiskFlag::PoorPriceMomentum => "Poor price momentum",
            RiskFlag::ConcentratedOwnership => "Concentrated ownership",
            RiskFlag::SafetyConcerns => "Safety concerns",
        }
    }

    /// Flags raised by a set of component scores
    pub fn from_scores(scores: &ComponentScores) -> Vec<RiskFlag> {
        let mut flags = Vec::new();
        if scores.volume < 4.0 {
            flags.push(RiskFlag::LowVolumeActivity);
        }
        if scores.price < 4.0 {
            flags.push(RiskFlag::PoorPriceMomentum);
        }
        if scores.holder < 5.0 {
            flags.push(RiskFlag::ConcentratedOwnership);
        }
        if scores.safety < 6.0 {
            flags.push(RiskFlag::SafetyConcerns);
        }
        flags
    }
}

impl fmt::Display for RiskFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Headline metrics carried alongside a score for display
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyMetrics {
    pub market_cap: f64,
    pub volume_24h: f64,
    pub liquidity_usd: f64,
    pub price_change_1h: f64,
    pub price_change_24h: f64,
}

impl From<&Snapshot> for KeyMetrics {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            market_cap: snapshot.market_cap,
            volume_24h: snapshot.volume.h24,
            liquidity_usd: snapshot.liquidity_usd,
            price_change_1h: snapshot.price_change_pct.h1,
            price_change_24h: snapshot.price_change_pct.h24,
        }
    }
}

/// Ranking of one snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub symbol: String,
    pub address: String,
    pub status: ScoreStatus,
    /// In [0, 10]; 0 unless analyzed
    pub final_score: f64,
    pub component_scores: Option<ComponentScores>,
    pub age_bonus: f64,
    pub next_check_minutes: u32,
    pub risk_flags: Vec<RiskFlag>,
    pub key_metrics: Option<KeyMetrics>,
    /// Present iff rejected or errored
    pub reason: Option<String>,
    pub dex_url: Option<String>,
}

impl ScoreResult {
    fn unscored(snapshot: &Snapshot, status: ScoreStatus, reason: String) -> Self {
        Self {
            symbol: snapshot.symbol.clone(),
            address: snapshot.address.clone(),
            status,
            final_score: 0.0,
            component_scores: None,
            age_bonus: 0.0,
            next_check_minutes: SLOWEST_CHECK_MINUTES,
            risk_flags: Vec::new(),
            key_metrics: None,
            reason: Some(reason),
            dex_url: snapshot.dex_url.clone(),
        }
    }

    pub fn is_analyzed(&self) -> bool {
        self.status == ScoreStatus::Analyzed
    }
}

/// Bonus for young pairs, added on top of the component average
pub fn age_bonus(age_hours: f64) -> f64 {
    if age_hours < 6.0 {
        2.0
    } else if age_hours < 12.0 {
        1.5
    } else if age_hours < 24.0 {
        1.0
    } else if age_hours < 48.0 {
        0.5
    } else {
        0.0
    }
}

/// How soon a candidate with this score should be looked at again
pub fn next_check_minutes(final_score: f64) -> u32 {
    if final_score < 3.0 {
        SLOWEST_CHECK_MINUTES
    } else if final_score < 5.0 {
        120
    } else if final_score < 7.0 {
        60
    } else {
        30
    }
}

/// Filter, score and rank snapshots
#[derive(Debug, Clone, Default)]
pub struct CompositeRanker {
    filter: SafetyFilter,
}

impl CompositeRanker {
    pub fn new(filter: SafetyFilter) -> Self {
        Self { filter }
    }

    pub fn filter(&self) -> &SafetyFilter {
        &self.filter
    }

    /// Rank a single snapshot. Pure; the same snapshot always ranks the same.
    pub fn rank(&self, snapshot: &Snapshot) -> ScoreResult {
        let outcome = self.filter.filter(snapshot);
        if !outcome.passed {
            return ScoreResult::unscored(snapshot, ScoreStatus::Rejected, outcome.reason);
        }

        let scores = match ComponentScores::compute(snapshot) {
            Ok(scores) => scores,
            Err(e) => {
                tracing::warn!("Scoring failed for {}: {}", snapshot.symbol, e);
                return ScoreResult::unscored(snapshot, ScoreStatus::Error, e.to_string());
            }
        };

        let bonus = age_bonus(snapshot.age_hours);
        let final_score = (scores.average() + bonus).min(SCORE_MAX);

        ScoreResult {
            symbol: snapshot.symbol.clone(),
            address: snapshot.address.clone(),
            status: ScoreStatus::Analyzed,
            final_score,
            component_scores: Some(scores),
            age_bonus: bonus,
            next_check_minutes: next_check_minutes(final_score),
            risk_flags: RiskFlag::from_scores(&scores),
            key_metrics: Some(KeyMetrics::from(snapshot)),
            reason: None,
            dex_url: snapshot.dex_url.clone(),
        }
    }

    /// Rank a batch and return the best `limit` analyzed results.
    ///
    /// Ties keep their input order.
    pub fn rank_many(&self, snapshots: &[Snapshot], limit: usize) -> Vec<ScoreResult> {
        let results: Vec<ScoreResult> = snapshots.iter().map(|s| self.rank(s)).collect();
        top_analyzed(results, limit)
    }
}

/// Keep analyzed results, stable-sorted by score descending, truncated
pub fn top_analyzed(results: Vec<ScoreResult>, limit: usize) -> Vec<ScoreResult> {
    let mut analyzed: Vec<ScoreResult> = results.into_iter().filter(|r| r.is_analyzed()).collect();
    // Vec::sort_by is stable
    analyzed.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));
    analyzed.truncate(limit);
    analyzed
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn create_candidate(symbol: &str) -> Snapshot {
        Snapshot::new(symbol, format!("{}-mint", symbol))
            .with_market_cap(50_000.0)
            .with_volume(3_000.0, 8_000.0, 20_000.0)
            .with_liquidity(10_000.0)
            .with_price_change(3.0, 15.0, 40.0)
            .with_txns_24h(350, 150)
            .with_age_hours(2.0)
    }

    #[test]
    fn test_age_bonus_steps() {
        assert_eq!(age_bonus(0.5), 2.0);
        assert_eq!(age_bonus(6.0), 1.5);
        assert_eq!(age_bonus(12.0), 1.0);
        assert_eq!(age_bonus(24.0), 0.5);
        assert_eq!(age_bonus(48.0), 0.0);
    }

    #[test]
    fn test_next_check_steps() {
        assert_eq!(next_check_minutes(0.0), 240);
        assert_eq!(next_check_minutes(3.0), 120);
        assert_eq!(next_check_minutes(5.0), 60);
        assert_eq!(next_check_minutes(7.0), 30);
        assert_eq!(next_check_minutes(10.0), 30);
    }

    #[test]
    fn test_rank_analyzed_candidate() {
        let ranker = CompositeRanker::default();
        let result = ranker.rank(&create_candidate("DMOON"));

        assert_eq!(result.status, ScoreStatus::Analyzed);
        assert!(result.reason.is_none());
        let scores = result.component_scores.unwrap();
        assert_relative_eq!(result.final_score, scores.average() + 2.0, epsilon = 1e-9);
        assert!(result.final_score >= 7.0);
        assert_eq!(result.next_check_minutes, 30);
        assert_eq!(result.age_bonus, 2.0);
        assert_eq!(result.risk_flags, vec![RiskFlag::SafetyConcerns]);
        assert_eq!(result.key_metrics.unwrap().volume_24h, 20_000.0);
    }

    #[test]
    fn test_rank_rejected() {
        let ranker = CompositeRanker::default();
        let result = ranker.rank(&create_candidate("DMOON").with_age_hours(100.0));

        assert_eq!(result.status, ScoreStatus::Rejected);
        assert_eq!(result.final_score, 0.0);
        assert_eq!(result.next_check_minutes, 240);
        assert!(result.component_scores.is_none());
        assert!(result.reason.unwrap().starts_with("Token too old"));
    }

    #[test]
    fn test_rank_rejects_out_of_range_snapshot() {
        let ranker = CompositeRanker::default();
        let result = ranker.rank(&create_candidate("DMOON").with_age_hours(f64::NAN));

        assert_eq!(result.status, ScoreStatus::Rejected);
        assert_eq!(result.final_score, 0.0);
        assert_eq!(result.reason.as_deref(), Some("Malformed input: age_hours"));
    }

    #[test]
    fn test_rank_error_is_contained() {
        let ranker = CompositeRanker::default();
        let snap = create_candidate("BOOM").with_volume(0.0, f64::MAX, 20_000.0);
        let result = ranker.rank(&snap);

        assert_eq!(result.status, ScoreStatus::Error);
        assert_eq!(result.next_check_minutes, 240);
        assert!(result.reason.unwrap().contains("growth ratio"));
    }

    #[test]
    fn test_final_score_capped() {
        let ranker = CompositeRanker::default();
        let snap = create_candidate("MAXX")
            .with_liquidity(60_000.0)
            .with_market_cap(2_000_000.0)
            .with_volume(40_000.0, 120_000.0, 300_000.0)
            .with_txns_24h(800, 700)
            .with_age_hours(1.0);
        let result = ranker.rank(&snap);
        assert!(result.final_score <= 10.0);
        assert!(result.final_score >= 9.0);
    }

    #[test]
    fn test_rank_many_orders_and_limits() {
        let ranker = CompositeRanker::default();
        let snaps = vec![
            create_candidate("OLDR").with_age_hours(30.0),
            create_candidate("SOL"),
            create_candidate("NEWR"),
            create_candidate("MIDR").with_age_hours(10.0),
        ];

        let top = ranker.rank_many(&snaps, 2);
        let symbols: Vec<&str> = top.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["NEWR", "MIDR"]);
    }

    #[test]
    fn test_rank_many_is_stable_for_ties() {
        let ranker = CompositeRanker::default();
        let snaps: Vec<Snapshot> = ["AAA1", "BBB2", "CCC3"]
            .iter()
            .map(|s| create_candidate(s))
            .collect();

        let top = ranker.rank_many(&snaps, 10);
        let symbols: Vec<&str> = top.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["AAA1", "BBB2", "CCC3"]);
    }

    #[test]
    fn test_rank_is_idempotent() {
        let ranker = CompositeRanker::default();
        let snap = create_candidate("DMOON");
        assert_eq!(ranker.rank(&snap), ranker.rank(&snap));
    }

    #[test]
    fn test_status_serializes_uppercase() {
        let json = serde_json::to_string(&ScoreStatus::Analyzed).unwrap();
        assert_eq!(json, "\"ANALYZED\"");
    }
}
