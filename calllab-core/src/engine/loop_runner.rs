//! Candle-by-candle simulation driver — the heart of the engine.
//!
//! Per candle, exactly one of:
//! 1. Flat: push the candle into the indicator engine, advance the entry
//!    evaluator, and open the position if ENTRY fires.
//! 2. In position: age the trade one candle and run the exit resolver.
//!
//! After the last candle an open position is force-closed at the last
//! candle's decision price with reason `end_of_data`. The run is single
//! position: once the trade closes the remaining candles are not visited.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use crate::domain::{validate_candles, Candle, Event, EventKind, ExitReason, Position};
use crate::indicators::IndicatorEngine;
use crate::plan::StrategyPlan;

use super::entry::EntryEvaluator;
use super::execution::resolve_candle;
use super::state::{SimulationError, SimulationResult};
use super::trade_extraction::summarize;

/// Run one simulation. Fails only on malformed candle data.
pub fn run(candles: &[Candle], plan: &StrategyPlan) -> Result<SimulationResult, SimulationError> {
    run_with_cancel(candles, plan, None)
}

/// Run one simulation with an optional cooperative cancellation flag.
///
/// The flag is checked between candles, never mid-candle. A cancelled run
/// returns [`SimulationError::Cancelled`] and nothing partial.
pub fn run_with_cancel(
    candles: &[Candle],
    plan: &StrategyPlan,
    cancel: Option<&AtomicBool>,
) -> Result<SimulationResult, SimulationError> {
    validate_candles(candles)?;

    let fill_model = plan.fill_model();
    let costs = plan.costs();
    let exits = plan.exits();

    let mut indicators = IndicatorEngine::new(&plan.entry().signal.required_series());
    let mut entry = EntryEvaluator::new(plan.entry());
    let mut position: Option<Position> = None;
    let mut closed: Option<(Position, ExitReason)> = None;
    let mut events: Vec<Event> = Vec::new();

    for (index, candle) in candles.iter().enumerate() {
        if cancel.is_some_and(|f| f.load(Ordering::Relaxed)) {
            debug!(index, "simulation cancelled");
            return Err(SimulationError::Cancelled { at_index: index });
        }

        let outcome = match position.as_mut() {
            None => {
                let snapshot = indicators.update(candle);
                if entry.on_candle(&snapshot) {
                    let fill = costs.buy_fill(fill_model.decision_price(candle));
                    events.push(Event::new(
                        index,
                        candle.timestamp,
                        EventKind::Entry,
                        fill,
                        100.0,
                    ));
                    debug!(index, time = ?candle.datetime(), fill, "entry");
                    position = Some(Position::open(
                        fill,
                        index,
                        candle.timestamp,
                        exits.initial_stop(fill),
                    ));
                }
                None
            }
            Some(pos) => {
                pos.trade_age_candles += 1;
                resolve_candle(pos, candle, index, exits, fill_model, costs, &mut events)
            }
        };

        if let Some(reason) = outcome {
            debug!(index, reason = reason.as_str(), "position closed");
            closed = position.take().map(|p| (p, reason));
            break;
        }
    }

    if let (Some(mut pos), Some(last)) = (position.take(), candles.last()) {
        let index = candles.len() - 1;
        let size = pos.size_pct;
        let fill = costs.sell_fill(fill_model.decision_price(last));
        pos.close_all(index, fill);
        events.push(
            Event::new(index, last.timestamp, EventKind::ExitFull, fill, size)
                .with_reason(ExitReason::EndOfData),
        );
        debug!(index, time = ?last.datetime(), fill, "end of data exit");
        closed = Some((pos, ExitReason::EndOfData));
    }

    let summary = closed.map(|(pos, reason)| summarize(&pos, reason, candles));
    Ok(SimulationResult { events, summary })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IntegrityViolation;
    use crate::plan::{compile, ExitConfig, StrategyConfig, TargetConfig};

    fn candle(i: usize, open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle::new(i as i64 * 60_000, open, high, low, close, 100.0)
    }

    fn target_plan(size_pct: f64, profit_pct: f64) -> StrategyPlan {
        compile(&StrategyConfig {
            exits: ExitConfig {
                targets: vec![TargetConfig {
                    size_pct,
                    profit_pct,
                }],
                ..Default::default()
            },
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn empty_series_produces_nothing() {
        let result = run(&[], &target_plan(100.0, 100.0)).unwrap();
        assert!(result.events.is_empty());
        assert!(result.summary.is_none());
    }

    #[test]
    fn entry_candle_runs_no_exit_checks() {
        // The entry candle's own high reaches the target; only the next
        // candle may fill it.
        let candles = [
            candle(0, 1.0, 3.0, 1.0, 1.0),
            candle(1, 1.0, 1.5, 1.0, 1.2),
        ];
        let result = run(&candles, &target_plan(100.0, 100.0)).unwrap();
        let summary = result.summary.unwrap();
        assert_eq!(summary.exit_reason, ExitReason::EndOfData);
        assert_eq!(result.events.len(), 2);
    }

    #[test]
    fn partial_ladder_closes_rest_at_end_of_data() {
        let candles = [
            candle(0, 1.0, 1.0, 1.0, 1.0),
            candle(1, 1.0, 2.1, 1.0, 1.9),
            candle(2, 1.9, 1.9, 1.5, 1.6),
        ];
        let result = run(&candles, &target_plan(50.0, 100.0)).unwrap();
        let kinds: Vec<EventKind> = result.events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::Entry,
                EventKind::TargetHit,
                EventKind::PartialExit,
                EventKind::ExitFull,
            ]
        );
        let last = result.events.last().unwrap();
        assert_eq!(last.reason, Some(ExitReason::EndOfData));
        assert_eq!(last.size_pct, 50.0);
        assert_eq!(last.price, 1.6);

        let summary = result.summary.unwrap();
        assert!((summary.exit_price - 1.8).abs() < 1e-12);
        assert!((summary.realized_pnl_pct - 80.0).abs() < 1e-9);
    }

    #[test]
    fn stops_visiting_candles_after_close() {
        let candles = [
            candle(0, 1.0, 1.0, 1.0, 1.0),
            candle(1, 1.0, 2.0, 1.0, 2.0),
            candle(2, 2.0, 5.0, 2.0, 5.0),
        ];
        let result = run(&candles, &target_plan(100.0, 100.0)).unwrap();
        assert_eq!(result.events.last().unwrap().candle_index, 1);
        assert_eq!(result.summary.unwrap().exit_index, 1);
    }

    #[test]
    fn integrity_error_names_the_candle() {
        let candles = [
            candle(0, 1.0, 1.0, 1.0, 1.0),
            candle(1, 1.0, 0.9, 1.1, 1.0),
        ];
        let err = run(&candles, &target_plan(100.0, 100.0)).unwrap_err();
        assert_eq!(
            err,
            SimulationError::DataIntegrity(crate::domain::DataIntegrityError {
                index: 1,
                violation: IntegrityViolation::HighBelowLow,
            })
        );
    }

    #[test]
    fn preset_cancel_flag_stops_before_first_candle() {
        let flag = AtomicBool::new(true);
        let candles = [candle(0, 1.0, 1.0, 1.0, 1.0)];
        let err = run_with_cancel(&candles, &target_plan(100.0, 100.0), Some(&flag)).unwrap_err();
        assert_eq!(err, SimulationError::Cancelled { at_index: 0 });
    }
}
