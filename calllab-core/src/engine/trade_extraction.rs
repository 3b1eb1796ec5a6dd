//! Trade extraction — folds a closed position into its `TradeSummary`.
//!
//! Pure function of the position's exit legs and the candle timestamps.

use crate::domain::trade::{realized_pnl_pct, weighted_exit_price};
use crate::domain::{Candle, ExitReason, Position, TradeSummary};

/// Build the summary for a position closed with `reason`.
///
/// The exit index is the candle of the last exit leg; a position without
/// legs is reported as exiting on its entry candle.
pub fn summarize(position: &Position, reason: ExitReason, candles: &[Candle]) -> TradeSummary {
    let exit_index = position
        .legs
        .last()
        .map_or(position.entry_index, |leg| leg.candle_index);
    let exit_timestamp = candles
        .get(exit_index)
        .map_or(position.entry_timestamp, |c| c.timestamp);

    TradeSummary {
        entry_index: position.entry_index,
        entry_timestamp: position.entry_timestamp,
        entry_price: position.entry_price,
        exit_index,
        exit_timestamp,
        exit_price: weighted_exit_price(&position.legs),
        exit_reason: reason,
        exit_legs: position.legs.len(),
        realized_pnl_pct: realized_pnl_pct(position.entry_price, &position.legs),
        duration_candles: exit_index - position.entry_index,
        mfe_pct: position.mfe_pct(),
        mae_pct: position.mae_pct(),
    }
}
