//! Simulation events — the append-only record of everything a run did.

use serde::{Deserialize, Serialize};

use super::trade::ExitReason;

/// Kind of a simulation event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Entry,
    TargetHit,
    PartialExit,
    TrailingActivated,
    StopHit,
    TimeExit,
    ExitFull,
}

impl EventKind {
    /// True for events that move position size (entries and exits).
    pub fn is_fill(self) -> bool {
        matches!(self, Self::Entry | Self::PartialExit | Self::ExitFull)
    }
}

/// One entry in a run's event stream.
///
/// `price` is the cost-adjusted fill price for fills (ENTRY, PARTIAL_EXIT,
/// EXIT_FULL), the raw trigger level for TARGET_HIT / STOP_HIT / TIME_EXIT,
/// and the initial trailing stop level for TRAILING_ACTIVATED.
///
/// `size_pct` is the share of the original position the event affects
/// (for TRAILING_ACTIVATED: the size still open).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub candle_index: usize,
    pub timestamp: i64,
    pub kind: EventKind,
    pub price: f64,
    pub size_pct: f64,
    /// Set on EXIT_FULL only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<ExitReason>,
    /// Ladder position (0-based, ascending profit) for TARGET_HIT and the
    /// fill that follows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<usize>,
}

impl Event {
    pub fn new(
        candle_index: usize,
        timestamp: i64,
        kind: EventKind,
        price: f64,
        size_pct: f64,
    ) -> Self {
        Self {
            candle_index,
            timestamp,
            kind,
            price,
            size_pct,
            reason: None,
            target: None,
        }
    }

    pub fn with_reason(mut self, reason: ExitReason) -> Self {
        self.reason = Some(reason);
        self
    }

    pub fn with_target(mut self, target: usize) -> Self {
        self.target = Some(target);
        self
    }
}
