//! Position Monitor
//!
//! Recurring loop over tracked positions: fetch the live snapshot, re-rank
//! it, evaluate exit signals against the entry snapshot and write the result
//! back into the tracker. Non-HOLD actions are pushed to the notifier, at
//! most once per cooldown window per position.
//!
//! Each tick starts by reloading the tracker so positions tracked or removed
//! by other processes are seen. Snapshot fetches for one tick run
//! concurrently; tracker writes happen one position at a time under the
//! write lock.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::sync::{broadcast, Notify, RwLock};

use crate::domain::exit_signals::{ExitAction, ExitEvaluation, ExitSignalEvaluator};
use crate::domain::position::{Alert, Position, PositionStatus, PositionUpdate, Urgency};
use crate::domain::position_tracker::PositionTracker;
use crate::domain::ranker::CompositeRanker;
use crate::domain::snapshot::Snapshot;
use crate::ports::market_data::{SnapshotSource, SnapshotSourceError};
use crate::ports::notifier::AlertNotifier;

/// Default time between ticks
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// Default minimum gap between two alerts for the same position
pub const DEFAULT_ALERT_COOLDOWN: Duration = Duration::from_secs(300);

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub interval: Duration,
    pub alert_cooldown: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            alert_cooldown: DEFAULT_ALERT_COOLDOWN,
        }
    }
}

/// Published after each position is processed
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    PositionUpdated {
        position: Box<Position>,
        action: ExitAction,
    },
    AlertRaised(Alert),
    CheckFailed {
        position_id: String,
        symbol: String,
        reason: String,
    },
}

/// Counters for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub checked: usize,
    pub updated: usize,
    pub alerts: usize,
    pub failures: usize,
}

struct Target {
    id: String,
    symbol: String,
    address: String,
}

/// Watches tracked positions for exit conditions
#[derive(Clone)]
pub struct PositionMonitor {
    tracker: Arc<RwLock<PositionTracker>>,
    source: Arc<dyn SnapshotSource>,
    ranker: CompositeRanker,
    evaluator: ExitSignalEvaluator,
    notifier: Arc<dyn AlertNotifier>,
    config: MonitorConfig,
    is_running: Arc<RwLock<bool>>,
    shutdown: Arc<Notify>,
    events: broadcast::Sender<MonitorEvent>,
}

impl PositionMonitor {
    pub fn new(
        tracker: Arc<RwLock<PositionTracker>>,
        source: Arc<dyn SnapshotSource>,
        ranker: CompositeRanker,
        notifier: Arc<dyn AlertNotifier>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            tracker,
            source,
            ranker,
            evaluator: ExitSignalEvaluator::new(),
            notifier,
            config: MonitorConfig::default(),
            is_running: Arc::new(RwLock::new(false)),
            shutdown: Arc::new(Notify::new()),
            events,
        }
    }

    pub fn with_config(mut self, config: MonitorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn tracker(&self) -> Arc<RwLock<PositionTracker>> {
        Arc::clone(&self.tracker)
    }

    /// Receive events from now on
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.events.subscribe()
    }

    /// Tick until `stop()` is called.
    ///
    /// A stop requested before `run` starts ends it after the first tick.
    pub async fn run(&self) {
        *self.is_running.write().await = true;

        tracing::info!(
            "Starting position monitor - interval: {:?}, alert cooldown: {:?}, notifier: {}",
            self.config.interval,
            self.config.alert_cooldown,
            self.notifier.name()
        );

        loop {
            let report = self.tick().await;
            if report.failures > 0 {
                tracing::warn!(
                    "Tick finished with {} failures out of {} positions",
                    report.failures,
                    report.checked
                );
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.interval) => {}
                _ = self.shutdown.notified() => break,
            }
        }

        *self.is_running.write().await = false;
        tracing::info!("Position monitor stopped");
    }

    pub async fn stop(&self) {
        *self.is_running.write().await = false;
        // Stores a permit when `run` is mid-tick or not started yet
        self.shutdown.notify_one();
        tracing::info!("Stop signal sent to position monitor");
    }

    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    /// Check every open position once
    pub async fn tick(&self) -> TickReport {
        self.tick_at(Utc::now()).await
    }

    /// `tick` with an explicit clock
    pub async fn tick_at(&self, now: DateTime<Utc>) -> TickReport {
        let targets: Vec<Target> = {
            let mut tracker = self.tracker.write().await;
            if let Err(e) = tracker.refresh() {
                tracing::warn!("Failed to reload portfolio, using cached positions: {}", e);
            }
            tracker
                .list()
                .iter()
                .filter(|p| p.status != PositionStatus::Exited)
                .map(|p| Target {
                    id: p.id.clone(),
                    symbol: p.symbol.clone(),
                    address: p.address.clone(),
                })
                .collect()
        };

        let mut report = TickReport {
            checked: targets.len(),
            ..Default::default()
        };
        if targets.is_empty() {
            tracing::debug!("No open positions to check");
            return report;
        }

        let fetches = targets.iter().map(|t| self.source.fetch_snapshot(&t.address));
        let results: Vec<Result<Option<Snapshot>, SnapshotSourceError>> = join_all(fetches).await;

        for (target, result) in targets.iter().zip(results) {
            let snapshot = match result {
                Ok(Some(snapshot)) => snapshot,
                Ok(None) => {
                    self.record_failure(&mut report, target, "no listed pair".to_string());
                    continue;
                }
                Err(e) => {
                    self.record_failure(&mut report, target, e.to_string());
                    continue;
                }
            };

            if self.process(target, snapshot, now, &mut report).await {
                report.updated += 1;
            }
        }

        tracing::info!(
            "Monitor tick: {} checked, {} updated, {} alerts, {} failures",
            report.checked,
            report.updated,
            report.alerts,
            report.failures
        );
        report
    }

    /// Evaluate and store one live reading; false when the position is gone
    async fn process(
        &self,
        target: &Target,
        snapshot: Snapshot,
        now: DateTime<Utc>,
        report: &mut TickReport,
    ) -> bool {
        let ranked = self.ranker.rank(&snapshot);
        let live_score = ranked.is_analyzed().then_some(ranked.final_score);
        let current_score = ranked.is_analyzed().then_some(ranked);

        let (updated, evaluation, alert_due) = {
            let mut tracker = self.tracker.write().await;
            let Some(position) = tracker.get(&target.id) else {
                tracing::debug!("Position {} removed during tick", target.id);
                return false;
            };

            let evaluation = self.evaluator.evaluate(position, &snapshot, live_score);
            let alert_due = evaluation.action.is_alert()
                && !position.in_alert_cooldown(now, self.cooldown_secs());

            let update = PositionUpdate {
                current_snapshot: Some(snapshot),
                current_score,
                price_change_pct: Some(evaluation.change_since_entry_pct),
                profit_loss_pct: Some(evaluation.change_since_entry_pct),
                status: Some(evaluation.status),
                exit_signals: Some(evaluation.signals.clone()),
                last_action: Some(evaluation.action),
                last_alert_time: None,
            };
            tracker.update_at(&target.id, update, now);

            match tracker.get(&target.id) {
                Some(position) => (position.clone(), evaluation, alert_due),
                None => return false,
            }
        };

        tracing::debug!(
            "{}: {} ({:+.1}% since entry)",
            updated.symbol,
            evaluation.action,
            evaluation.change_since_entry_pct
        );
        let _ = self.events.send(MonitorEvent::PositionUpdated {
            position: Box::new(updated.clone()),
            action: evaluation.action,
        });

        if alert_due {
            self.raise_alert(&updated, &evaluation, now).await;
            report.alerts += 1;
        } else if evaluation.action.is_alert() {
            tracing::debug!(
                "{} alert for {} suppressed by cooldown",
                evaluation.action,
                updated.symbol
            );
        }
        true
    }

    async fn raise_alert(
        &self,
        position: &Position,
        evaluation: &ExitEvaluation,
        now: DateTime<Utc>,
    ) {
        if let Err(e) = self
            .notifier
            .notify(position, evaluation.action, &evaluation.signals)
            .await
        {
            tracing::error!(
                "Failed to deliver {} alert for {}: {}",
                evaluation.action,
                position.symbol,
                e
            );
        }

        let urgency = match evaluation.action {
            ExitAction::SellNow => Urgency::Critical,
            _ => Urgency::High,
        };
        let message = evaluation
            .signals
            .iter()
            .map(|s| s.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");

        let alert = {
            let mut tracker = self.tracker.write().await;
            let alert = tracker.add_alert_at(
                &position.id,
                evaluation.action.as_str(),
                message,
                urgency,
                now,
            );
            tracker.update_at(&position.id, PositionUpdate::alerted_at(now), now);
            alert
        };

        let _ = self.events.send(MonitorEvent::AlertRaised(alert));
    }

    fn record_failure(&self, report: &mut TickReport, target: &Target, reason: String) {
        tracing::warn!(
            "Skipping {} ({}): {}",
            target.symbol,
            target.address,
            reason
        );
        report.failures += 1;
        let _ = self.events.send(MonitorEvent::CheckFailed {
            position_id: target.id.clone(),
            symbol: target.symbol.clone(),
            reason,
        });
    }

    fn cooldown_secs(&self) -> i64 {
        i64::try_from(self.config.alert_cooldown.as_secs()).unwrap_or(i64::MAX)
    }
}
