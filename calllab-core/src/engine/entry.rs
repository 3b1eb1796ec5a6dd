//! Entry evaluator — decides when the single position opens.
//!
//! Two states. While `NoPosition`, the configured signal is evaluated on
//! every candle. The first true signal at candle `i` moves the evaluator to
//! `AwaitingDelay`; ENTRY then fires at `i + delay` whether or not the
//! signal still holds. A signal is a trigger, not a condition.

use crate::indicators::IndicatorSnapshot;
use crate::plan::{CrossDirection, EntryPlan, EntrySignal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    NoPosition,
    AwaitingDelay { signal_index: usize },
}

#[derive(Debug, Clone)]
pub struct EntryEvaluator {
    signal: EntrySignal,
    delay: usize,
    state: EntryState,
    /// Previous candle's (fast, slow) values, for cross detection.
    prev_pair: Option<(f64, f64)>,
}

impl EntryEvaluator {
    pub fn new(plan: &EntryPlan) -> Self {
        Self {
            signal: plan.signal,
            delay: plan.delay,
            state: EntryState::NoPosition,
            prev_pair: None,
        }
    }

    pub fn state(&self) -> EntryState {
        self.state
    }

    /// Advance one candle. Returns `true` when ENTRY fires on this candle.
    ///
    /// Must be called for consecutive candles, each with the snapshot
    /// computed through that candle.
    pub fn on_candle(&mut self, snapshot: &IndicatorSnapshot) -> bool {
        let index = snapshot.index;
        match self.state {
            EntryState::NoPosition => {
                if !self.signal_fires(snapshot) {
                    return false;
                }
                if self.delay == 0 {
                    return true;
                }
                self.state = EntryState::AwaitingDelay {
                    signal_index: index,
                };
                false
            }
            EntryState::AwaitingDelay { signal_index } => index >= signal_index + self.delay,
        }
    }

    fn signal_fires(&mut self, snapshot: &IndicatorSnapshot) -> bool {
        match self.signal {
            EntrySignal::Immediate => snapshot.index == 0,
            EntrySignal::IndicatorThreshold {
                series,
                comparison,
                level,
            } => snapshot
                .get(series)
                .is_some_and(|value| comparison.holds(value, level)),
            EntrySignal::IndicatorCross {
                fast,
                slow,
                direction,
            } => {
                let current = snapshot.get(fast).zip(snapshot.get(slow));
                let crossed = match (self.prev_pair, current) {
                    (Some((pf, ps)), Some((f, s))) => match direction {
                        CrossDirection::Up => pf <= ps && f > s,
                        CrossDirection::Down => pf >= ps && f < s,
                    },
                    _ => false,
                };
                self.prev_pair = current;
                crossed
            }
        }
    }
}
