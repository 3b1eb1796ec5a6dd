//! Candle — the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLCV candle for a single token over one interval.
///
/// `timestamp` is the candle open time in Unix epoch milliseconds. Sequences
/// handed to the engine are ordered ascending, deduplicated, and never extend
/// past the simulation window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// What is wrong with a candle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityViolation {
    NonFinite,
    NonPositivePrice,
    NegativeVolume,
    HighBelowLow,
    OpenOutsideRange,
    CloseOutsideRange,
    TimestampNotIncreasing,
}

impl std::fmt::Display for IntegrityViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::NonFinite => "non-finite value",
            Self::NonPositivePrice => "non-positive price",
            Self::NegativeVolume => "negative volume",
            Self::HighBelowLow => "high below low",
            Self::OpenOutsideRange => "open outside [low, high]",
            Self::CloseOutsideRange => "close outside [low, high]",
            Self::TimestampNotIncreasing => "timestamp not strictly increasing",
        };
        f.write_str(text)
    }
}

/// A malformed candle, identified by its position in the input sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("data integrity violation at candle {index}: {violation}")]
pub struct DataIntegrityError {
    pub index: usize,
    pub violation: IntegrityViolation,
}

impl Candle {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Candle open time as a UTC datetime, if the timestamp is representable.
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }

    /// Check OHLCV sanity for a single candle.
    ///
    /// Returns the first violation found, in a fixed order so the same bad
    /// candle always reports the same reason.
    pub fn check(&self) -> Result<(), IntegrityViolation> {
        let fields = [self.open, self.high, self.low, self.close, self.volume];
        if fields.iter().any(|v| !v.is_finite()) {
            return Err(IntegrityViolation::NonFinite);
        }
        if self.open <= 0.0 || self.high <= 0.0 || self.low <= 0.0 || self.close <= 0.0 {
            return Err(IntegrityViolation::NonPositivePrice);
        }
        if self.volume < 0.0 {
            return Err(IntegrityViolation::NegativeVolume);
        }
        if self.high < self.low {
            return Err(IntegrityViolation::HighBelowLow);
        }
        if self.open < self.low || self.open > self.high {
            return Err(IntegrityViolation::OpenOutsideRange);
        }
        if self.close < self.low || self.close > self.high {
            return Err(IntegrityViolation::CloseOutsideRange);
        }
        Ok(())
    }

    pub fn is_sane(&self) -> bool {
        self.check().is_ok()
    }
}

/// Validate a whole candle sequence before any of it is simulated.
///
/// Each candle must pass [`Candle::check`] and timestamps must be strictly
/// increasing. The engine never repairs data: the first offending candle is
/// reported and the caller decides whether to skip, patch, or abort.
pub fn validate_candles(candles: &[Candle]) -> Result<(), DataIntegrityError> {
    let mut prev_ts: Option<i64> = None;
    for (index, candle) in candles.iter().enumerate() {
        candle
            .check()
            .map_err(|violation| DataIntegrityError { index, violation })?;
        if prev_ts.is_some_and(|prev| candle.timestamp <= prev) {
            return Err(DataIntegrityError {
                index,
                violation: IntegrityViolation::TimestampNotIncreasing,
            });
        }
        prev_ts = Some(candle.timestamp);
    }
    Ok(())
}
