//! Scoring Pipeline Integration Tests
//!
//! End-to-end checks across the public API:
//! 1. Raw pair -> Snapshot -> SafetyFilter -> scorers -> CompositeRanker
//! 2. PositionTracker -> ExitSignalEvaluator decisions
//! 3. PositionMonitor ticks over mock ports
//!
//! All tests are deterministic (no real network calls) and use mock data.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use tokio::sync::RwLock;

use memescope::application::{PositionMonitor, Scanner};
use memescope::domain::{
    CompositeRanker, ExitAction, ExitSignalEvaluator, PositionStatus, PositionTracker,
    ScoreStatus, SignalType, Snapshot, TrackerError, Urgency,
};
use memescope::ports::{MockSnapshotSource, RawPair, RecordingNotifier};

// ============================================================================
// Test Fixtures
// ============================================================================

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

/// The reference candidate: 2h old, $50k cap, $20k volume, $10k liquidity
fn create_scenario_snapshot(symbol: &str, address: &str) -> Snapshot {
    Snapshot::new(symbol, address)
        .with_market_cap(50_000.0)
        .with_volume(3_000.0, 8_000.0, 20_000.0)
        .with_liquidity(10_000.0)
        .with_price_change(3.0, 15.0, 40.0)
        .with_txns_24h(350, 150)
        .with_age_hours(2.0)
}

/// Entry snapshot with a $100k cap for exit scenarios
fn create_entry_snapshot() -> Snapshot {
    create_scenario_snapshot("DMOON", "Mint111").with_market_cap(100_000.0)
}

// ============================================================================
// Ranking Pipeline
// ============================================================================

#[test]
fn test_scenario_with_only_headline_metrics() {
    // Without hourly volume, 6h movement or transactions the volume and
    // holder scorers get little to work with, so the age bonus alone cannot
    // lift the token into the fastest re-check band.
    let snap = Snapshot::new("DMOON", "Mint111")
        .with_market_cap(50_000.0)
        .with_volume(0.0, 0.0, 20_000.0)
        .with_liquidity(10_000.0)
        .with_price_change(3.0, 0.0, 40.0)
        .with_age_hours(2.0);
    let result = CompositeRanker::default().rank(&snap);

    assert_eq!(result.status, ScoreStatus::Analyzed);
    assert!((result.final_score - 6.275).abs() < 1e-9, "score {}", result.final_score);
    assert_eq!(result.next_check_minutes, 60);
    assert_eq!(result.age_bonus, 2.0);
}

#[test]
fn test_scenario_candidate_ranks_high() {
    let ranker = CompositeRanker::default();
    let result = ranker.rank(&create_scenario_snapshot("DMOON", "Mint111"));

    assert_eq!(result.status, ScoreStatus::Analyzed);
    assert!(result.final_score >= 7.0, "score {}", result.final_score);
    assert!(result.final_score <= 10.0);
    assert_eq!(result.next_check_minutes, 30);

    let components = result.component_scores.unwrap();
    let expected = (components.average() + result.age_bonus).min(10.0);
    assert!((result.final_score - expected).abs() < 1e-12);
}

#[test]
fn test_age_window_rejects_regardless_of_metrics() {
    let ranker = CompositeRanker::default();
    for age in [0.0, 0.1, 0.249, 72.5, 500.0] {
        let snapshot = create_scenario_snapshot("DMOON", "Mint111")
            .with_market_cap(5_000_000.0)
            .with_liquidity(80_000.0)
            .with_age_hours(age);
        let result = ranker.rank(&snapshot);
        assert_eq!(result.status, ScoreStatus::Rejected, "age {}", age);
        assert_eq!(result.final_score, 0.0);
        assert!(result.reason.is_some());
    }
}

#[test]
fn test_raw_pair_flows_through_ranker() {
    let now = t0();
    let created_ms = (now - Duration::hours(2)).timestamp_millis();
    let pair: RawPair = serde_json::from_value(serde_json::json!({
        "pairAddress": "Pair111",
        "url": "https://dexscreener.com/solana/pair111",
        "baseToken": { "address": "Mint111", "name": "Doge Moon", "symbol": "DMOON" },
        "priceUsd": "0.00005",
        "marketCap": "50000",
        "liquidity": { "usd": 10000 },
        "volume": { "h1": 3000, "h6": 8000, "h24": 20000 },
        "priceChange": { "h1": 3, "h6": 15, "h24": 40 },
        "txns": { "h24": { "buys": 350, "sells": 150 } },
        "pairCreatedAt": created_ms
    }))
    .unwrap();

    let result = CompositeRanker::default().rank(&pair.to_snapshot(now));
    assert_eq!(result.status, ScoreStatus::Analyzed);
    assert_eq!(
        result.dex_url.as_deref(),
        Some("https://dexscreener.com/solana/pair111")
    );
}

#[test]
fn test_malformed_pair_fails_closed() {
    let pair: RawPair = serde_json::from_value(serde_json::json!({
        "baseToken": { "address": "Mint111", "symbol": "DMOON" },
        "marketCap": 50000,
        "liquidity": { "usd": "plenty" },
        "volume": { "h24": 20000 },
        "pairCreatedAt": (t0() - Duration::hours(2)).timestamp_millis()
    }))
    .unwrap();

    let result = CompositeRanker::default().rank(&pair.to_snapshot(t0()));
    assert_eq!(result.status, ScoreStatus::Rejected);
    assert!(result.reason.unwrap().starts_with("Malformed input"));
}

#[test]
fn test_rank_many_is_stable_and_idempotent() {
    let ranker = CompositeRanker::default();
    let batch: Vec<Snapshot> = ["AAA", "BBB", "CCC", "DDD"]
        .iter()
        .map(|s| create_scenario_snapshot(s, &format!("{}-mint", s)))
        .collect();

    let first = ranker.rank_many(&batch, 10);
    let second = ranker.rank_many(&batch, 10);

    let order: Vec<&str> = first.iter().map(|r| r.symbol.as_str()).collect();
    assert_eq!(order, vec!["AAA", "BBB", "CCC", "DDD"]);
    assert_eq!(first, second);
    assert_eq!(ranker.rank_many(&batch, 2).len(), 2);
}

#[test]
fn test_scoring_error_does_not_stop_batch() {
    let ranker = CompositeRanker::default();
    let broken =
        create_scenario_snapshot("BROKEN", "Mint999").with_volume(3_000.0, f64::MAX, 20_000.0);
    let batch = vec![broken, create_scenario_snapshot("GOOD", "Mint111")];

    assert_eq!(ranker.rank(&batch[0]).status, ScoreStatus::Error);
    let ranked = ranker.rank_many(&batch, 10);
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].symbol, "GOOD");
}

#[tokio::test]
async fn test_scanner_over_mock_source() {
    let source = MockSnapshotSource::new().with_candidates(vec![
        create_scenario_snapshot("DMOON", "Mint111"),
        create_scenario_snapshot("SOL", "So111"),
        create_scenario_snapshot("OLDCAT", "Mint222").with_age_hours(100.0),
    ]);
    let scanner = Scanner::new(Arc::new(source), CompositeRanker::default());

    let report = scanner.scan(10, 7.0).await.unwrap();

    assert_eq!(report.candidates, 3);
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].symbol, "DMOON");
    assert_eq!(report.rejections.values().sum::<usize>(), 2);
}

// ============================================================================
// Exit Signals
// ============================================================================

#[test]
fn test_crash_from_entry_is_sell_now() {
    let ranker = CompositeRanker::default();
    let entry = create_entry_snapshot();
    let mut tracker = PositionTracker::in_memory();
    let position = tracker
        .create_at(entry.clone(), &ranker.rank(&entry), 0.0, t0())
        .unwrap();

    let current = entry.with_market_cap(5_000.0);
    let eval = ExitSignalEvaluator::new().evaluate(&position, &current, None);

    assert_eq!(eval.action, ExitAction::SellNow);
    assert_eq!(eval.status, PositionStatus::Danger);
    assert!((eval.change_since_entry_pct - -95.0).abs() < 1e-9);
    assert!(eval
        .signals
        .iter()
        .any(|s| s.signal_type == SignalType::CriticalLoss));
}

#[test]
fn test_ten_x_is_take_profit_with_single_milestone() {
    let ranker = CompositeRanker::default();
    let entry = create_entry_snapshot();
    let mut tracker = PositionTracker::in_memory();
    let position = tracker
        .create_at(entry.clone(), &ranker.rank(&entry), 0.0, t0())
        .unwrap();

    let current = entry.with_market_cap(1_100_000.0);
    let eval = ExitSignalEvaluator::new().evaluate(&position, &current, None);

    assert_eq!(eval.action, ExitAction::TakeProfit);
    assert_eq!(eval.status, PositionStatus::Profit);
    let types: Vec<SignalType> = eval.signals.iter().map(|s| s.signal_type).collect();
    assert_eq!(types, vec![SignalType::Profit10x]);
}

#[test]
fn test_critical_beats_profit() {
    let ranker = CompositeRanker::default();
    let entry = create_entry_snapshot();
    let mut tracker = PositionTracker::in_memory();
    let position = tracker
        .create_at(entry.clone(), &ranker.rank(&entry), 0.0, t0())
        .unwrap();

    // Up 10x, but half the liquidity is gone
    let current = entry
        .with_market_cap(1_100_000.0)
        .with_liquidity(5_000.0);
    let eval = ExitSignalEvaluator::new().evaluate(&position, &current, None);

    assert_eq!(eval.action, ExitAction::SellNow);
    assert!(eval
        .signals
        .iter()
        .all(|s| s.signal_type != SignalType::Profit10x));
}

// ============================================================================
// Position Tracker
// ============================================================================

#[test]
fn test_duplicate_tracking_is_declined() {
    let ranker = CompositeRanker::default();
    let entry = create_entry_snapshot();
    let score = ranker.rank(&entry);
    let mut tracker = PositionTracker::in_memory();

    tracker.create(entry.clone(), &score, 100.0).unwrap();
    let err = tracker.create(entry, &score, 100.0).unwrap_err();

    assert_eq!(err, TrackerError::AlreadyTracking("Mint111".to_string()));
    assert_eq!(tracker.len(), 1);
}

#[test]
fn test_portfolio_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("portfolio.json");
    let ranker = CompositeRanker::default();
    let entry = create_entry_snapshot();

    let (position_id, alert_id) = {
        let mut tracker = PositionTracker::open(&path).unwrap();
        let position = tracker
            .create_at(entry.clone(), &ranker.rank(&entry), 250.0, t0())
            .unwrap();
        let alert = tracker.add_alert_at(
            &position.id,
            "WARNING",
            "Down 7.0% - monitor closely",
            Urgency::High,
            t0(),
        );
        (position.id, alert.id)
    };

    let mut reopened = PositionTracker::open(&path).unwrap();
    let position = reopened.get(&position_id).unwrap();
    assert_eq!(position.symbol, "DMOON");
    assert_eq!(position.investment_amount, 250.0);
    assert_eq!(position.entry_time, t0());
    assert_eq!(reopened.active_alerts().len(), 1);

    assert!(reopened.acknowledge_alert(&alert_id));
    assert!(PositionTracker::open(&path).unwrap().active_alerts().is_empty());
}

// ============================================================================
// Position Monitor
// ============================================================================

#[tokio::test]
async fn test_monitor_end_to_end() {
    let ranker = CompositeRanker::default();
    let crashing = create_entry_snapshot();
    let mooning = create_scenario_snapshot("WIFCAT", "Mint222").with_market_cap(100_000.0);

    let mut tracker = PositionTracker::in_memory();
    let crash_id = tracker
        .create_at(crashing.clone(), &ranker.rank(&crashing), 0.0, t0())
        .unwrap()
        .id;
    let moon_id = tracker
        .create_at(mooning.clone(), &ranker.rank(&mooning), 0.0, t0())
        .unwrap()
        .id;
    let tracker = Arc::new(RwLock::new(tracker));

    let source = MockSnapshotSource::new()
        .with_live(crashing.with_market_cap(5_000.0))
        .with_live(mooning.with_market_cap(1_100_000.0));
    let notifier = RecordingNotifier::new();
    let monitor = PositionMonitor::new(
        Arc::clone(&tracker),
        Arc::new(source),
        ranker,
        Arc::new(notifier.clone()),
    );

    let report = monitor.tick_at(t0() + Duration::minutes(30)).await;
    assert_eq!(report.checked, 2);
    assert_eq!(report.updated, 2);
    assert_eq!(report.alerts, 2);

    let guard = tracker.read().await;
    assert_eq!(guard.get(&crash_id).unwrap().status, PositionStatus::Danger);
    assert_eq!(guard.get(&moon_id).unwrap().status, PositionStatus::Profit);
    assert_eq!(guard.get(&moon_id).unwrap().peak_profit_pct, 1000.0);

    let summary = guard.summary();
    assert_eq!(summary.danger, 1);
    assert_eq!(summary.profit, 1);
    assert_eq!(summary.active_alerts, 2);
    assert!((summary.avg_profit_pct - 452.5).abs() < 1e-9);

    let urgencies: Vec<Urgency> = guard.alerts().iter().map(|a| a.urgency).collect();
    assert!(urgencies.contains(&Urgency::Critical));
    assert!(urgencies.contains(&Urgency::High));
    drop(guard);

    let actions: Vec<ExitAction> = notifier.sent().iter().map(|a| a.action).collect();
    assert!(actions.contains(&ExitAction::SellNow));
    assert!(actions.contains(&ExitAction::TakeProfit));
}
