//! Strategy plans — compiled, immutable strategy definitions.
//!
//! A [`StrategyConfig`] is loosely typed and untrusted. [`compile`] checks
//! every invariant once and produces a [`StrategyPlan`] built from tagged
//! variants, so the per-candle loop never re-inspects raw configuration.
//! A `StrategyPlan` can only be obtained from `compile`.

pub mod compiler;
pub mod config;

pub use compiler::{compile, PlanRejected, RejectionReason};
pub use config::{
    EntryConfig, ExecutionConfig, ExitConfig, StrategyConfig, TargetConfig, TrailingConfig,
};

use serde::Serialize;

use crate::domain::Candle;
use crate::engine::CostModel;
use crate::indicators::Series;

/// Which candle price same-candle fills use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FillModel {
    Open,
    Close,
}

impl FillModel {
    /// The candle's decision price under this model.
    pub fn decision_price(self, candle: &Candle) -> f64 {
        match self {
            Self::Open => candle.open,
            Self::Close => candle.close,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Above,
    Below,
}

impl Comparison {
    /// Strict comparison of `value` against `level`.
    pub fn holds(self, value: f64, level: f64) -> bool {
        match self {
            Self::Above => value > level,
            Self::Below => value < level,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossDirection {
    Up,
    Down,
}

/// Entry signal, evaluated on each candle while flat.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum EntrySignal {
    /// True on the first candle.
    Immediate,
    /// `series` strictly above/below `level`.
    IndicatorThreshold {
        series: Series,
        comparison: Comparison,
        level: f64,
    },
    /// `fast` crosses `slow` in `direction` between the previous and current candle.
    IndicatorCross {
        fast: Series,
        slow: Series,
        direction: CrossDirection,
    },
}

impl EntrySignal {
    /// Series the indicator engine must compute for this signal.
    pub fn required_series(&self) -> Vec<Series> {
        match *self {
            Self::Immediate => Vec::new(),
            Self::IndicatorThreshold { series, .. } => vec![series],
            Self::IndicatorCross { fast, slow, .. } => vec![fast, slow],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EntryPlan {
    pub signal: EntrySignal,
    /// Candles between the first true signal and the entry fill.
    pub delay: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExecutionPlan {
    pub fill_model: FillModel,
    pub costs: CostModel,
}

/// One ladder rung; ladders are stored in ascending `profit_pct` order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Target {
    pub size_pct: f64,
    pub profit_pct: f64,
}

impl Target {
    pub fn price(&self, entry_price: f64) -> f64 {
        entry_price * (1.0 + self.profit_pct / 100.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrailingPlan {
    pub trail_pct: f64,
    pub activate_profit_pct: f64,
    pub breakeven_after_first_target: bool,
}

impl TrailingPlan {
    /// Trailing stop level for a given high watermark.
    pub fn stop_for(&self, high_watermark: f64) -> f64 {
        high_watermark * (1.0 - self.trail_pct / 100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExitPlan {
    pub ladder: Vec<Target>,
    pub stop_loss_pct: Option<f64>,
    pub trailing: Option<TrailingPlan>,
    pub max_candles_in_trade: Option<usize>,
}

impl ExitPlan {
    /// Initial hard stop for a position entered at `entry_price`.
    pub fn initial_stop(&self, entry_price: f64) -> Option<f64> {
        self.stop_loss_pct.map(|pct| entry_price * (1.0 - pct / 100.0))
    }

    pub fn breakeven_enabled(&self) -> bool {
        self.trailing.is_some_and(|t| t.breakeven_after_first_target)
    }
}

/// A validated strategy. Immutable once compiled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyPlan {
    name: Option<String>,
    entry: EntryPlan,
    execution: ExecutionPlan,
    exits: ExitPlan,
}

impl StrategyPlan {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn entry(&self) -> &EntryPlan {
        &self.entry
    }

    pub fn execution(&self) -> &ExecutionPlan {
        &self.execution
    }

    pub fn exits(&self) -> &ExitPlan {
        &self.exits
    }

    pub fn fill_model(&self) -> FillModel {
        self.execution.fill_model
    }

    pub fn costs(&self) -> &CostModel {
        &self.execution.costs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_price_follows_fill_model() {
        let c = Candle::new(0, 10.0, 12.0, 9.0, 11.0, 1.0);
        assert_eq!(FillModel::Open.decision_price(&c), 10.0);
        assert_eq!(FillModel::Close.decision_price(&c), 11.0);
    }

    #[test]
    fn comparisons_are_strict() {
        assert!(Comparison::Below.holds(29.9, 30.0));
        assert!(!Comparison::Below.holds(30.0, 30.0));
        assert!(Comparison::Above.holds(70.1, 70.0));
        assert!(!Comparison::Above.holds(70.0, 70.0));
    }

    #[test]
    fn target_and_trailing_prices() {
        let t = Target {
            size_pct: 100.0,
            profit_pct: 100.0,
        };
        assert_eq!(t.price(1.0), 2.0);

        let trail = TrailingPlan {
            trail_pct: 10.0,
            activate_profit_pct: 20.0,
            breakeven_after_first_target: false,
        };
        assert!((trail.stop_for(2.0) - 1.8).abs() < 1e-12);
    }

    #[test]
    fn required_series_per_signal() {
        assert!(EntrySignal::Immediate.required_series().is_empty());
        let cross = EntrySignal::IndicatorCross {
            fast: Series::Close,
            slow: Series::Ema(20),
            direction: CrossDirection::Up,
        };
        assert_eq!(cross.required_series(), vec![Series::Close, Series::Ema(20)]);
    }
}
