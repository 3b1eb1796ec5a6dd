//! Exit resolver — applies the intrabar path policy to an open position.
//!
//! A candle only carries O/H/L/C, so a candle that touches both the stop and
//! a target is ambiguous. For longs the path is taken to be
//! **open → low → high → close**, which fixes the per-candle order:
//!
//! 1. Stop: `low <= effective stop` closes everything; nothing else runs.
//! 2. Targets: ascending profit, every level `<= high` fills its slice.
//!    Breakeven is applied after the first target.
//! 3. Trailing: activation and watermark update. The new level only
//!    applies from the next candle's stop check.
//! 4. Time: age at or past the limit closes the rest at the decision price.

use tracing::trace;

use crate::domain::{Candle, Event, EventKind, ExitReason, Position};
use crate::plan::{ExitPlan, FillModel};

use super::cost_model::CostModel;

/// One candle's worth of exit resolution.
///
/// Mutates `position`, appends events in intra-candle order, and returns the
/// terminal exit reason when the position is fully closed on this candle.
pub fn resolve_candle(
    position: &mut Position,
    candle: &Candle,
    index: usize,
    exits: &ExitPlan,
    fill_model: FillModel,
    costs: &CostModel,
    events: &mut Vec<Event>,
) -> Option<ExitReason> {
    position.observe(candle);
    let ts = candle.timestamp;

    // ── Phase 1: stop (the low comes before the high) ──
    if let Some(stop) = position.effective_stop() {
        if candle.low <= stop {
            let size = position.size_pct;
            emit(events, Event::new(index, ts, EventKind::StopHit, stop, size));
            let fill = costs.sell_fill(stop);
            position.close_all(index, fill);
            emit(
                events,
                Event::new(index, ts, EventKind::ExitFull, fill, size)
                    .with_reason(ExitReason::StopLoss),
            );
            return Some(ExitReason::StopLoss);
        }
    }

    // ── Phase 2: ladder targets ──
    while let Some(target) = exits.ladder.get(position.next_target) {
        let level = target.price(position.entry_price);
        if candle.high < level {
            break;
        }
        let rung = position.next_target;
        position.next_target += 1;

        let fill = costs.sell_fill(level);
        let size = position.close_slice(index, fill, target.size_pct);
        emit(
            events,
            Event::new(index, ts, EventKind::TargetHit, level, size).with_target(rung),
        );
        if position.is_closed() {
            emit(
                events,
                Event::new(index, ts, EventKind::ExitFull, fill, size)
                    .with_reason(ExitReason::TakeProfit)
                    .with_target(rung),
            );
            return Some(ExitReason::TakeProfit);
        }
        emit(
            events,
            Event::new(index, ts, EventKind::PartialExit, fill, size).with_target(rung),
        );

        if rung == 0 && exits.breakeven_enabled() && !position.breakeven_applied {
            let stop = position.raise_stop(position.entry_price);
            position.breakeven_applied = true;
            trace!(index, stop, "stop raised to breakeven");
        }
    }

    // ── Phase 3: trailing stop ──
    if let Some(trailing) = exits.trailing {
        if position.trailing_active {
            position.high_watermark = position.high_watermark.max(candle.high);
            position.raise_trailing_stop(trailing.stop_for(position.high_watermark));
        } else if position.profit_pct_at(candle.high) >= trailing.activate_profit_pct {
            position.trailing_active = true;
            position.high_watermark = candle.high;
            let level = position.raise_trailing_stop(trailing.stop_for(candle.high));
            emit(
                events,
                Event::new(
                    index,
                    ts,
                    EventKind::TrailingActivated,
                    level,
                    position.size_pct,
                ),
            );
        }
    }

    // ── Phase 4: time exit ──
    if let Some(max_candles) = exits.max_candles_in_trade {
        if position.trade_age_candles >= max_candles {
            let price = fill_model.decision_price(candle);
            let size = position.size_pct;
            emit(events, Event::new(index, ts, EventKind::TimeExit, price, size));
            let fill = costs.sell_fill(price);
            position.close_all(index, fill);
            emit(
                events,
                Event::new(index, ts, EventKind::ExitFull, fill, size)
                    .with_reason(ExitReason::TimeExit),
            );
            return Some(ExitReason::TimeExit);
        }
    }

    None
}

fn emit(events: &mut Vec<Event>, event: Event) {
    trace!(
        index = event.candle_index,
        kind = ?event.kind,
        price = event.price,
        size_pct = event.size_pct,
        "event"
    );
    events.push(event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{Target, TrailingPlan};

    fn candle(index: usize, open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle::new(index as i64 * 60_000, open, high, low, close, 1.0)
    }

    fn exits() -> ExitPlan {
        ExitPlan {
            ladder: Vec::new(),
            stop_loss_pct: None,
            trailing: None,
            max_candles_in_trade: None,
        }
    }

    fn kinds(events: &[Event]) -> Vec<EventKind> {
        events.iter().map(|e| e.kind).collect()
    }

    fn resolve(
        pos: &mut Position,
        c: &Candle,
        index: usize,
        plan: &ExitPlan,
    ) -> (Option<ExitReason>, Vec<Event>) {
        let mut events = Vec::new();
        let out = resolve_candle(
            pos,
            c,
            index,
            plan,
            FillModel::Close,
            &CostModel::frictionless(),
            &mut events,
        );
        (out, events)
    }

    #[test]
    fn stop_wins_over_target_in_same_candle() {
        let mut plan = exits();
        plan.ladder.push(Target {
            size_pct: 100.0,
            profit_pct: 50.0,
        });
        let mut pos = Position::open(1.0, 0, 0, Some(0.9));
        let (out, events) = resolve(&mut pos, &candle(1, 1.0, 1.6, 0.85, 1.5), 1, &plan);

        assert_eq!(out, Some(ExitReason::StopLoss));
        assert_eq!(kinds(&events), vec![EventKind::StopHit, EventKind::ExitFull]);
        assert_eq!(events[0].price, 0.9);
        assert!(pos.is_closed());
    }

    #[test]
    fn ladder_fills_several_targets_in_one_candle() {
        let mut plan = exits();
        plan.ladder = vec![
            Target {
                size_pct: 50.0,
                profit_pct: 50.0,
            },
            Target {
                size_pct: 25.0,
                profit_pct: 100.0,
            },
            Target {
                size_pct: 25.0,
                profit_pct: 300.0,
            },
        ];
        let mut pos = Position::open(1.0, 0, 0, None);
        let (out, events) = resolve(&mut pos, &candle(1, 1.0, 2.5, 1.0, 2.2), 1, &plan);

        assert_eq!(out, None);
        assert_eq!(
            kinds(&events),
            vec![
                EventKind::TargetHit,
                EventKind::PartialExit,
                EventKind::TargetHit,
                EventKind::PartialExit,
            ]
        );
        assert_eq!(events[1].price, 1.5);
        assert_eq!(events[3].price, 2.0);
        assert_eq!(pos.size_pct, 25.0);
        assert_eq!(pos.next_target, 2);
    }

    #[test]
    fn last_target_emits_exit_full() {
        let mut plan = exits();
        plan.ladder.push(Target {
            size_pct: 100.0,
            profit_pct: 100.0,
        });
        let mut pos = Position::open(1.0, 0, 0, None);
        let (out, events) = resolve(&mut pos, &candle(1, 1.5, 2.0, 1.4, 1.9), 1, &plan);

        assert_eq!(out, Some(ExitReason::TakeProfit));
        assert_eq!(kinds(&events), vec![EventKind::TargetHit, EventKind::ExitFull]);
        assert_eq!(events[1].reason, Some(ExitReason::TakeProfit));
        assert_eq!(pos.size_pct, 0.0);
    }

    #[test]
    fn breakeven_applies_after_first_target() {
        let mut plan = exits();
        plan.ladder.push(Target {
            size_pct: 50.0,
            profit_pct: 50.0,
        });
        plan.trailing = Some(TrailingPlan {
            trail_pct: 50.0,
            activate_profit_pct: 500.0,
            breakeven_after_first_target: true,
        });
        let mut pos = Position::open(1.0, 0, 0, Some(0.8));
        resolve(&mut pos, &candle(1, 1.0, 1.6, 1.0, 1.5), 1, &plan);
        assert_eq!(pos.stop_price, Some(1.0));
        assert!(pos.breakeven_applied);

        // Next candle dips back to entry: stopped at breakeven.
        let (out, events) = resolve(&mut pos, &candle(2, 1.4, 1.4, 0.99, 1.1), 2, &plan);
        assert_eq!(out, Some(ExitReason::StopLoss));
        assert_eq!(events[1].size_pct, 50.0);
        assert_eq!(events[1].price, 1.0);
    }

    #[test]
    fn trailing_activates_once_and_applies_next_candle() {
        let mut plan = exits();
        plan.trailing = Some(TrailingPlan {
            trail_pct: 10.0,
            activate_profit_pct: 20.0,
            breakeven_after_first_target: false,
        });
        let mut pos = Position::open(1.0, 0, 0, None);

        // Activates at high 1.3 -> stop 1.17, even though low 1.1 is below it.
        let (out, events) = resolve(&mut pos, &candle(1, 1.2, 1.3, 1.1, 1.25), 1, &plan);
        assert_eq!(out, None);
        assert_eq!(kinds(&events), vec![EventKind::TrailingActivated]);
        assert!((events[0].price - 1.17).abs() < 1e-12);

        // Higher high ratchets the stop without a second activation event.
        let (_, events) = resolve(&mut pos, &candle(2, 1.25, 1.5, 1.2, 1.45), 2, &plan);
        assert!(events.is_empty());
        assert!((pos.trailing_stop.unwrap() - 1.35).abs() < 1e-12);

        // A lower high leaves the stop alone.
        let (_, _) = resolve(&mut pos, &candle(3, 1.45, 1.46, 1.36, 1.4), 3, &plan);
        assert!((pos.trailing_stop.unwrap() - 1.35).abs() < 1e-12);

        let (out, _) = resolve(&mut pos, &candle(4, 1.4, 1.4, 1.3, 1.32), 4, &plan);
        assert_eq!(out, Some(ExitReason::StopLoss));
    }

    #[test]
    fn time_exit_at_decision_price() {
        let mut plan = exits();
        plan.max_candles_in_trade = Some(2);
        let mut pos = Position::open(1.0, 0, 0, None);

        pos.trade_age_candles = 1;
        let (out, _) = resolve(&mut pos, &candle(1, 1.0, 1.1, 0.9, 1.05), 1, &plan);
        assert_eq!(out, None);

        pos.trade_age_candles = 2;
        let (out, events) = resolve(&mut pos, &candle(2, 1.05, 1.1, 1.0, 1.07), 2, &plan);
        assert_eq!(out, Some(ExitReason::TimeExit));
        assert_eq!(kinds(&events), vec![EventKind::TimeExit, EventKind::ExitFull]);
        assert_eq!(events[0].price, 1.07);
    }

    #[test]
    fn exit_fills_pay_costs() {
        let mut plan = exits();
        plan.ladder.push(Target {
            size_pct: 100.0,
            profit_pct: 100.0,
        });
        let mut pos = Position::open(1.0, 0, 0, None);
        let mut events = Vec::new();
        resolve_candle(
            &mut pos,
            &candle(1, 1.0, 2.0, 1.0, 2.0),
            1,
            &plan,
            FillModel::Close,
            &CostModel::new(50.0, 50.0),
            &mut events,
        );
        // Trigger at the raw level, fill 1% below it.
        assert_eq!(events[0].price, 2.0);
        assert!((events[1].price - 1.98).abs() < 1e-12);
    }
}
