//! Position — the single open long position of a simulation run.
//!
//! Stops follow the ratchet rule: once set, a stop level may only rise.
//! Neither the hard stop (raised to breakeven) nor the trailing stop
//! (raised by the high watermark) can ever loosen.

use serde::{Deserialize, Serialize};

use super::candle::Candle;
use super::trade::ExitLeg;

/// Sizes below this are treated as fully closed (guards float drift in
/// ladders like 33.3 / 33.3 / 33.4).
pub const SIZE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    // ── Entry ──
    /// Entry fill price; the cost basis for every exit leg.
    pub entry_price: f64,
    pub entry_index: usize,
    pub entry_timestamp: i64,

    // ── Size ──
    /// Remaining share of the original position, 0–100, never increases.
    pub size_pct: f64,

    // ── Stops ──
    /// Hard stop; raised at most once, to breakeven.
    pub stop_price: Option<f64>,
    /// Trailing stop level, present once trailing is active.
    pub trailing_stop: Option<f64>,
    pub high_watermark: f64,
    pub trailing_active: bool,
    pub breakeven_applied: bool,

    // ── Progress ──
    pub trade_age_candles: usize,
    /// Index of the first unconsumed ladder target.
    pub next_target: usize,

    // ── Excursion ──
    pub highest_high: f64,
    pub lowest_low: f64,

    // ── Realized ──
    pub legs: Vec<ExitLeg>,
}

impl Position {
    pub fn open(
        entry_price: f64,
        entry_index: usize,
        entry_timestamp: i64,
        stop_price: Option<f64>,
    ) -> Self {
        Self {
            entry_price,
            entry_index,
            entry_timestamp,
            size_pct: 100.0,
            stop_price,
            trailing_stop: None,
            high_watermark: entry_price,
            trailing_active: false,
            breakeven_applied: false,
            trade_age_candles: 0,
            next_target: 0,
            highest_high: entry_price,
            lowest_low: entry_price,
            legs: Vec::new(),
        }
    }

    /// The stop that applies to the next low check: the tighter (higher)
    /// of the hard stop and the trailing stop.
    pub fn effective_stop(&self) -> Option<f64> {
        match (self.stop_price, self.trailing_stop) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }

    /// Raise the hard stop to at least `level`. Lower proposals are ignored.
    pub fn raise_stop(&mut self, level: f64) -> f64 {
        let ratcheted = self.stop_price.map_or(level, |cur| cur.max(level));
        self.stop_price = Some(ratcheted);
        ratcheted
    }

    /// Raise the trailing stop to at least `level`. Lower proposals are ignored.
    pub fn raise_trailing_stop(&mut self, level: f64) -> f64 {
        let ratcheted = self.trailing_stop.map_or(level, |cur| cur.max(level));
        self.trailing_stop = Some(ratcheted);
        ratcheted
    }

    /// Unrealized profit at `price`, percent of entry.
    pub fn profit_pct_at(&self, price: f64) -> f64 {
        (price / self.entry_price - 1.0) * 100.0
    }

    /// Fold a candle's range into the excursion trackers.
    pub fn observe(&mut self, candle: &Candle) {
        self.highest_high = self.highest_high.max(candle.high);
        self.lowest_low = self.lowest_low.min(candle.low);
    }

    /// Record an exit leg and shrink the remaining size.
    ///
    /// The requested size is clamped to what is still open; the realized
    /// size is returned.
    pub fn close_slice(&mut self, candle_index: usize, fill_price: f64, size_pct: f64) -> f64 {
        let size = size_pct.min(self.size_pct).max(0.0);
        self.size_pct -= size;
        if self.size_pct < SIZE_EPSILON {
            self.size_pct = 0.0;
        }
        self.legs.push(ExitLeg {
            candle_index,
            fill_price,
            size_pct: size,
        });
        size
    }

    /// Close everything still open. Returns the closed size.
    pub fn close_all(&mut self, candle_index: usize, fill_price: f64) -> f64 {
        let remaining = self.size_pct;
        self.close_slice(candle_index, fill_price, remaining)
    }

    pub fn is_closed(&self) -> bool {
        self.size_pct < SIZE_EPSILON
    }

    pub fn mfe_pct(&self) -> f64 {
        self.profit_pct_at(self.highest_high).max(0.0)
    }

    pub fn mae_pct(&self) -> f64 {
        self.profit_pct_at(self.lowest_low).min(0.0)
    }
}
