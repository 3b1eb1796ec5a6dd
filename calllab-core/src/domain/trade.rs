//! TradeSummary — the closed round trip of a single simulation run.

use serde::{Deserialize, Serialize};

/// Why the final slice of a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    TimeExit,
    EndOfData,
}

impl ExitReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StopLoss => "stop_loss",
            Self::TakeProfit => "take_profit",
            Self::TimeExit => "time_exit",
            Self::EndOfData => "end_of_data",
        }
    }
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One realized slice of a position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExitLeg {
    pub candle_index: usize,
    pub fill_price: f64,
    pub size_pct: f64,
}

/// Summary of one entry → exit round trip.
///
/// PnL is measured against the entry fill, which stays the cost basis for
/// every leg: partial exits do not blend a new average price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSummary {
    // ── Entry ──
    pub entry_index: usize,
    pub entry_timestamp: i64,
    pub entry_price: f64,

    // ── Exit ──
    pub exit_index: usize,
    pub exit_timestamp: i64,
    /// Size-weighted average of all exit fills.
    pub exit_price: f64,
    pub exit_reason: ExitReason,
    pub exit_legs: usize,

    // ── PnL ──
    /// Realized profit as a percent of the cost basis.
    pub realized_pnl_pct: f64,

    // ── Duration ──
    pub duration_candles: usize,

    // ── Excursion ──
    /// Best unrealized gain while open, percent of entry (from candle highs).
    pub mfe_pct: f64,
    /// Worst unrealized loss while open, percent of entry (from candle lows, ≤ 0).
    pub mae_pct: f64,
}

impl TradeSummary {
    /// Realized return as a multiple of the cost basis (1.0 = flat, 2.0 = doubled).
    pub fn return_multiple(&self) -> f64 {
        1.0 + self.realized_pnl_pct / 100.0
    }

    /// Wall-clock time between the entry and the final exit candle.
    pub fn holding_time(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.exit_timestamp - self.entry_timestamp)
    }

    pub fn is_winner(&self) -> bool {
        self.realized_pnl_pct > 0.0
    }
}

/// Realized PnL (percent of cost basis) of a set of exit legs.
pub fn realized_pnl_pct(entry_price: f64, legs: &[ExitLeg]) -> f64 {
    legs.iter()
        .map(|leg| (leg.size_pct / 100.0) * (leg.fill_price / entry_price - 1.0) * 100.0)
        .sum()
}

/// Size-weighted average exit fill of a set of legs.
pub fn weighted_exit_price(legs: &[ExitLeg]) -> f64 {
    let total: f64 = legs.iter().map(|l| l.size_pct).sum();
    if total <= 0.0 {
        return 0.0;
    }
    legs.iter().map(|l| l.fill_price * l.size_pct).sum::<f64>() / total
}
