//! Incremental indicator engine and per-candle snapshots.

use std::collections::BTreeMap;

use crate::domain::Candle;

use super::{EmaState, RsiState, Series};

/// Indicator values as of one candle, computed from candles `[0, index]`.
///
/// Series still in warmup are absent.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSnapshot {
    pub index: usize,
    pub close: f64,
    values: BTreeMap<Series, f64>,
}

impl IndicatorSnapshot {
    pub fn get(&self, series: Series) -> Option<f64> {
        match series {
            Series::Close => Some(self.close),
            other => self.values.get(&other).copied(),
        }
    }
}

#[derive(Debug, Clone)]
enum SeriesState {
    Ema(EmaState),
    Rsi(RsiState),
}

impl SeriesState {
    fn update(&mut self, close: f64) -> Option<f64> {
        match self {
            Self::Ema(s) => s.update(close),
            Self::Rsi(s) => s.update(close),
        }
    }
}

/// Streaming indicator computation, one candle at a time.
///
/// The engine only ever sees the candles pushed into it, so a snapshot for
/// candle `t` cannot depend on anything after `t`.
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    states: Vec<(Series, SeriesState)>,
    next_index: usize,
}

impl IndicatorEngine {
    /// Build an engine for the given series. `Close` needs no state and
    /// duplicates are computed once.
    pub fn new(series: &[Series]) -> Self {
        let mut wanted: Vec<Series> = series
            .iter()
            .copied()
            .filter(|s| *s != Series::Close)
            .collect();
        wanted.sort();
        wanted.dedup();

        let states = wanted
            .into_iter()
            .filter_map(|s| match s {
                Series::Ema(p) => Some((s, SeriesState::Ema(EmaState::new(p)))),
                Series::Rsi(p) => Some((s, SeriesState::Rsi(RsiState::new(p)))),
                Series::Close => None,
            })
            .collect();

        Self {
            states,
            next_index: 0,
        }
    }

    /// Push the next candle and return the snapshot as of that candle.
    pub fn update(&mut self, candle: &Candle) -> IndicatorSnapshot {
        let index = self.next_index;
        self.next_index += 1;

        let mut values = BTreeMap::new();
        for (series, state) in &mut self.states {
            if let Some(v) = state.update(candle.close) {
                values.insert(*series, v);
            }
        }

        IndicatorSnapshot {
            index,
            close: candle.close,
            values,
        }
    }

    /// Number of candles consumed so far.
    pub fn candles_seen(&self) -> usize {
        self.next_index
    }
}

/// Snapshot at `index`, computed from `candles[..=index]` only.
///
/// Returns `None` when `index` is past the end of `candles`.
pub fn indicators_at(
    candles: &[Candle],
    index: usize,
    series: &[Series],
) -> Option<IndicatorSnapshot> {
    let prefix = candles.get(..=index)?;
    let mut engine = IndicatorEngine::new(series);
    prefix.iter().map(|c| engine.update(c)).last()
}
