//! Indicator engine — RSI and EMA over candle closes.
//!
//! Indicators are causal: the value at candle `t` depends only on candles
//! `[0, t]`. The simulation driver feeds an [`IndicatorEngine`] one candle at
//! a time, so it structurally cannot see the future; [`indicators_at`] is the
//! pure prefix form of the same computation.

pub mod ema;
pub mod rsi;
pub mod series;
pub mod snapshot;

pub use ema::{Ema, EmaState};
pub use rsi::{Rsi, RsiState};
pub use series::{Series, SeriesParseError};
pub use snapshot::{indicators_at, IndicatorEngine, IndicatorSnapshot};

use crate::domain::Candle;

/// Batch form of an indicator, used for look-ahead checks and reporting.
///
/// `compute` returns one value per candle; warmup values are `f64::NAN`.
///
/// # Look-ahead contamination guard
/// No value at candle t may depend on data from candle t+1 or later.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "rsi_14", "ema_20").
    fn name(&self) -> &str;

    /// Number of candles needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    fn compute(&self, candles: &[Candle]) -> Vec<f64>;
}

/// Create synthetic candles from close prices for testing.
///
/// open = prev_close (or close for the first candle),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0.
#[cfg(test)]
pub fn make_candles(closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Candle::new(
                i as i64 * 60_000,
                open,
                open.max(close) + 1.0,
                open.min(close) - 1.0,
                close,
                1000.0,
            )
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
