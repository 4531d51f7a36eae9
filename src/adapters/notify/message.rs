//! Alert message formatting shared by the notifiers

use crate::domain::exit_signals::{ExitAction, ExitSignal};
use crate::domain::position::Position;

fn header(action: ExitAction) -> &'static str {
    match action {
        ExitAction::SellNow => "SELL NOW",
        ExitAction::TakeProfit => "TAKE PROFIT",
        ExitAction::Warning => "WARNING",
        ExitAction::Hold => "UPDATE",
    }
}

fn recommendation(action: ExitAction) -> Option<&'static str> {
    match action {
        ExitAction::SellNow => Some("ACTION: Consider exiting this position immediately!"),
        ExitAction::TakeProfit => Some("ACTION: Consider taking profits or setting a stop-loss!"),
        ExitAction::Warning => Some("ACTION: Monitor this position closely!"),
        ExitAction::Hold => None,
    }
}

/// Multi-line alert text for a position
pub fn format_exit_message(
    position: &Position,
    action: ExitAction,
    signals: &[ExitSignal],
) -> String {
    let mut lines = vec![
        format!("{} - {}", header(action), position.symbol),
        String::new(),
        format!("Time Held: {}", position.time_held_display()),
        format!("P/L: {:+.1}%", position.profit_loss_pct),
        String::new(),
    ];

    if !signals.is_empty() {
        lines.push("Signals:".to_string());
        for signal in signals {
            lines.push(format!("  - {}", signal.message));
        }
        lines.push(String::new());
    }

    if let Some(text) = recommendation(action) {
        lines.push(text.to_string());
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::exit_signals::ExitSignalEvaluator;
    use crate::domain::position::PositionUpdate;
    use crate::domain::ranker::CompositeRanker;
    use crate::domain::snapshot::Snapshot;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_sell_now_message() {
        let t0 = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let entry = Snapshot::new("DMOON", "Mint111")
            .with_market_cap(100_000.0)
            .with_volume(0.0, 0.0, 20_000.0)
            .with_liquidity(10_000.0)
            .with_age_hours(2.0);
        let score = CompositeRanker::default().rank(&entry);
        let mut position = Position::open("pos-1".into(), entry.clone(), &score, 0.0, t0);

        let current = entry.with_market_cap(5_000.0);
        let eval = ExitSignalEvaluator::new().evaluate(&position, &current, None);
        position.apply(
            PositionUpdate {
                profit_loss_pct: Some(eval.change_since_entry_pct),
                ..Default::default()
            },
            t0 + Duration::minutes(125),
        );

        let text = format_exit_message(&position, eval.action, &eval.signals);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "SELL NOW - DMOON");
        assert_eq!(lines[2], "Time Held: 2h 5m");
        assert_eq!(lines[3], "P/L: -95.0%");
        assert!(text.contains("  - SELL NOW! Price down -95.0% from entry"));
        assert!(text.ends_with("ACTION: Consider exiting this position immediately!"));
    }
}
