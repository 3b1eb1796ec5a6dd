//! Raw strategy configuration, as authored in TOML or JSON.
//!
//! Nothing here is trusted: modes and series are plain strings and numbers
//! may be out of range. [`compile`](super::compile) turns a `StrategyConfig`
//! into a validated [`StrategyPlan`](super::StrategyPlan) or a list of
//! rejection reasons.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub name: Option<String>,
    pub entry: EntryConfig,
    pub execution: ExecutionConfig,
    pub exits: ExitConfig,
}

/// Entry signal configuration.
///
/// `mode` is one of `immediate`, `indicator_threshold`, `indicator_cross`.
/// Threshold entries read `series`, `comparison` (`above`/`below`) and
/// `threshold`; cross entries read `fast`, `slow` and `direction`
/// (`up`/`down`). Series are named `close`, `ema_<n>` or `rsi_<n>`.
///
/// Indicator signals are only known at a candle's close. With
/// `execution.fill_model = "open"` an indicator entry must therefore set
/// `delay_candles >= 1`, otherwise compilation rejects it with
/// `same_candle_lookahead`. Immediate entries have no such restriction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryConfig {
    pub mode: String,
    pub delay_candles: Option<i64>,
    pub series: Option<String>,
    pub comparison: Option<String>,
    pub threshold: Option<f64>,
    pub fast: Option<String>,
    pub slow: Option<String>,
    pub direction: Option<String>,
}

impl Default for EntryConfig {
    fn default() -> Self {
        Self {
            mode: "immediate".to_string(),
            delay_candles: None,
            series: None,
            comparison: None,
            threshold: None,
            fast: None,
            slow: None,
            direction: None,
        }
    }
}

/// Fill model and trading costs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// `open` or `close`.
    pub fill_model: String,
    pub fee_bps: f64,
    pub slippage_bps: f64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            fill_model: "close".to_string(),
            fee_bps: 0.0,
            slippage_bps: 0.0,
        }
    }
}

/// Exit mechanisms. Any combination may be enabled; at least one must be.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitConfig {
    pub targets: Vec<TargetConfig>,
    pub stop_loss_pct: Option<f64>,
    pub trailing: Option<TrailingConfig>,
    pub max_candles_in_trade: Option<i64>,
}

/// One rung of the profit-target ladder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Share of the original position released at this target (percent).
    pub size_pct: f64,
    /// Profit over the entry price at which the target fills (percent; 100 = 2x).
    pub profit_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrailingConfig {
    pub trail_pct: f64,
    pub activate_profit_pct: f64,
    #[serde(default)]
    pub breakeven_after_first_target: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_toml_uses_defaults() {
        let cfg: StrategyConfig = toml::from_str(
            r#"
            [exits]
            stop_loss_pct = 20.0
            "#,
        )
        .unwrap();
        assert_eq!(cfg.entry.mode, "immediate");
        assert_eq!(cfg.execution.fill_model, "close");
        assert_eq!(cfg.exits.stop_loss_pct, Some(20.0));
        assert!(cfg.exits.targets.is_empty());
    }

    #[test]
    fn full_toml() {
        let cfg: StrategyConfig = toml::from_str(
            r#"
            name = "rsi dip ladder"

            [entry]
            mode = "indicator_threshold"
            series = "rsi_14"
            comparison = "below"
            threshold = 30.0
            delay_candles = 1

            [execution]
            fill_model = "open"
            fee_bps = 30.0
            slippage_bps = 50.0

            [exits]
            stop_loss_pct = 25.0
            max_candles_in_trade = 48

            [[exits.targets]]
            size_pct = 50.0
            profit_pct = 100.0

            [[exits.targets]]
            size_pct = 25.0
            profit_pct = 200.0

            [exits.trailing]
            trail_pct = 15.0
            activate_profit_pct = 50.0
            breakeven_after_first_target = true
            "#,
        )
        .unwrap();
        assert_eq!(cfg.name.as_deref(), Some("rsi dip ladder"));
        assert_eq!(cfg.exits.targets.len(), 2);
        assert_eq!(cfg.entry.delay_candles, Some(1));
        let trailing = cfg.exits.trailing.unwrap();
        assert!(trailing.breakeven_after_first_target);
    }

    #[test]
    fn json_config() {
        let cfg: StrategyConfig = serde_json::from_str(
            r#"{"exits": {"targets": [{"size_pct": 100, "profit_pct": 100}]}}"#,
        )
        .unwrap();
        assert_eq!(cfg.exits.targets[0].profit_pct, 100.0);
    }
}
