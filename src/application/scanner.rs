//! Scan Use Case
//!
//! Pulls candidates from a snapshot source, ranks every one of them and
//! keeps the best analyzed tokens.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use crate::domain::ranker::{top_analyzed, CompositeRanker, ScoreResult, ScoreStatus};
use crate::ports::market_data::{SnapshotSource, SnapshotSourceError};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Candidate fetch failed: {0}")]
    Source(#[from] SnapshotSourceError),
}

/// Outcome of one scan
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Best analyzed tokens, score descending
    pub results: Vec<ScoreResult>,
    pub candidates: usize,
    pub passed: usize,
    pub analyzed: usize,
    pub errors: usize,
    /// Rejection counts keyed by the reason prefix
    pub rejections: BTreeMap<String, usize>,
}

/// Fetch, rank and select scan candidates
pub struct Scanner {
    source: Arc<dyn SnapshotSource>,
    ranker: CompositeRanker,
}

impl Scanner {
    pub fn new(source: Arc<dyn SnapshotSource>, ranker: CompositeRanker) -> Self {
        Self { source, ranker }
    }

    /// Rank every candidate and keep analyzed results scoring at least
    /// `min_score`, best first, at most `limit` of them.
    pub async fn scan(&self, limit: usize, min_score: f64) -> Result<ScanReport, ScanError> {
        let candidates = self.source.fetch_candidates().await?;
        tracing::info!(
            "Ranking {} candidates from {}",
            candidates.len(),
            self.source.name()
        );

        let ranked: Vec<ScoreResult> = candidates.iter().map(|s| self.ranker.rank(s)).collect();

        let mut report = ScanReport {
            candidates: candidates.len(),
            ..Default::default()
        };
        for result in &ranked {
            match result.status {
                ScoreStatus::Rejected => {
                    let reason = result.reason.as_deref().unwrap_or("Unknown");
                    let key = reason.split_once(':').map_or(reason, |(k, _)| k);
                    *report.rejections.entry(key.to_string()).or_insert(0) += 1;
                }
                ScoreStatus::Analyzed => {
                    report.passed += 1;
                    report.analyzed += 1;
                }
                ScoreStatus::Error => {
                    report.passed += 1;
                    report.errors += 1;
                }
            }
        }

        let eligible: Vec<ScoreResult> = ranked
            .into_iter()
            .filter(|r| r.final_score >= min_score)
            .collect();
        report.results = top_analyzed(eligible, limit);

        log_summary(&report);
        Ok(report)
    }
}

fn log_summary(report: &ScanReport) {
    if !report.rejections.is_empty() {
        let mut reasons: Vec<(&String, &usize)> = report.rejections.iter().collect();
        reasons.sort_by(|a, b| b.1.cmp(a.1));
        for (reason, count) in reasons {
            tracing::info!("  rejected {:>4}  {}", count, reason);
        }
    }
    tracing::info!(
        "Scan: {} candidates, {} passed filter, {} analyzed, {} errors, {} selected",
        report.candidates,
        report.passed,
        report.analyzed,
        report.errors,
        report.results.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::snapshot::Snapshot;
    use crate::ports::mocks::MockSnapshotSource;

    fn create_candidate(symbol: &str, market_cap: f64, age_hours: f64) -> Snapshot {
        Snapshot::new(symbol, format!("{}-mint", symbol))
            .with_market_cap(market_cap)
            .with_volume(3_000.0, 8_000.0, 20_000.0)
            .with_liquidity(10_000.0)
            .with_price_change(3.0, 15.0, 40.0)
            .with_txns_24h(350, 150)
            .with_age_hours(age_hours)
    }

    fn scanner(candidates: Vec<Snapshot>) -> Scanner {
        let source = MockSnapshotSource::new().with_candidates(candidates);
        Scanner::new(Arc::new(source), CompositeRanker::default())
    }

    #[tokio::test]
    async fn test_scan_keeps_best_analyzed() {
        let scanner = scanner(vec![
            create_candidate("OLDMOON", 50_000.0, 40.0),
            create_candidate("NEWMOON", 50_000.0, 2.0),
            create_candidate("BABY", 50_000.0, 0.1),
        ]);

        let report = scanner.scan(10, 0.0).await.unwrap();

        assert_eq!(report.candidates, 3);
        assert_eq!(report.analyzed, 2);
        assert_eq!(report.results.len(), 2);
        assert_eq!(report.results[0].symbol, "NEWMOON");
        assert!(report.results[0].final_score >= report.results[1].final_score);
        assert_eq!(report.rejections.get("Token too new"), Some(&1));
    }

    #[tokio::test]
    async fn test_scan_applies_min_score_and_limit() {
        let scanner = scanner(vec![
            create_candidate("AAA", 50_000.0, 2.0),
            create_candidate("BBB", 50_000.0, 2.0),
            create_candidate("CCC", 50_000.0, 2.0),
        ]);

        let report = scanner.scan(2, 0.0).await.unwrap();
        assert_eq!(report.results.len(), 2);
        // Equal scores keep input order
        assert_eq!(report.results[0].symbol, "AAA");
        assert_eq!(report.results[1].symbol, "BBB");

        let report = scanner.scan(10, 10.5).await.unwrap();
        assert!(report.results.is_empty());
        assert_eq!(report.analyzed, 3);
    }

    #[tokio::test]
    async fn test_scan_empty_source() {
        let report = scanner(Vec::new()).scan(10, 0.0).await.unwrap();
        assert_eq!(report.candidates, 0);
        assert!(report.results.is_empty());
    }
}
