//! Strategy compiler — the only place plan invariants are checked.
//!
//! Every check runs and every failure is collected, so a caller sees the
//! full list of problems with a config at once. Nothing is partially
//! applied: either a complete [`StrategyPlan`] comes back or nothing does.

use serde::Serialize;
use thiserror::Error;

use crate::engine::CostModel;
use crate::indicators::Series;

use super::config::{EntryConfig, ExecutionConfig, ExitConfig, StrategyConfig};
use super::{
    Comparison, CrossDirection, EntryPlan, EntrySignal, ExecutionPlan, ExitPlan, FillModel,
    StrategyPlan, Target, TrailingPlan,
};

/// Ladder sums within this of 100 are accepted (33.3 + 33.3 + 33.4).
const LADDER_TOLERANCE: f64 = 1e-9;

/// Combined fee + slippage at or above this drives sell fills to zero or below.
const MAX_COST_BPS: f64 = 10_000.0;

/// One reason a strategy config cannot be compiled.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectionReason {
    #[error("ladder size_pct values sum to {total}, more than 100")]
    LadderOverflow { total: f64 },

    #[error("no exit path configured (need targets, stop loss, trailing stop or time exit)")]
    NoExitPath,

    #[error("{field} must be strictly positive, got {value}")]
    NonPositive { field: String, value: f64 },

    #[error("target {index}: {field} must be a positive number, got {value}")]
    InvalidTarget {
        index: usize,
        field: String,
        value: f64,
    },

    #[error("stop_loss_pct {value} would put the stop at or below zero")]
    StopTooWide { value: f64 },

    #[error("trail_pct {value} would put the trailing stop at or below zero")]
    TrailTooWide { value: f64 },

    #[error("{field} must be a non-negative number, got {value}")]
    NegativeCost { field: String, value: f64 },

    #[error("fee_bps + slippage_bps must be below 10000, got {total_bps}")]
    CostTooHigh { total_bps: f64 },

    #[error("unknown entry mode `{mode}`")]
    UnknownEntryMode { mode: String },

    #[error("unknown fill model `{model}` (expected open or close)")]
    UnknownFillModel { model: String },

    #[error("{field}: {detail}")]
    UnknownSeries { field: String, detail: String },

    #[error("unknown comparison `{comparison}` (expected above or below)")]
    UnknownComparison { comparison: String },

    #[error("unknown cross direction `{direction}` (expected up or down)")]
    UnknownCrossDirection { direction: String },

    #[error("entry mode `{mode}` requires `{param}`")]
    MissingEntryParam { mode: String, param: String },

    #[error("threshold must be finite, got {value}")]
    NonFiniteThreshold { value: f64 },

    #[error("cross entry compares `{series}` with itself")]
    IdenticalCrossSeries { series: String },

    #[error("delay_candles must be >= 0, got {value}")]
    NegativeDelay { value: i64 },

    #[error("breakeven_after_first_target is set but the ladder is empty")]
    BreakevenWithoutTargets,

    #[error("indicator entry with fill_model = open needs delay_candles >= 1")]
    SameCandleLookahead,
}

/// A config failed to compile. Holds every reason found.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error("strategy rejected: {}", join_reasons(.reasons))]
pub struct PlanRejected {
    pub reasons: Vec<RejectionReason>,
}

impl PlanRejected {
    pub fn contains(&self, pred: impl Fn(&RejectionReason) -> bool) -> bool {
        self.reasons.iter().any(pred)
    }
}

fn join_reasons(reasons: &[RejectionReason]) -> String {
    reasons
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Validate a raw config and compile it into an immutable plan.
pub fn compile(config: &StrategyConfig) -> Result<StrategyPlan, PlanRejected> {
    let mut reasons = Vec::new();

    let entry = compile_entry(&config.entry, &mut reasons);
    let execution = compile_execution(&config.execution, &mut reasons);
    let exits = compile_exits(&config.exits, &mut reasons);

    if let (Some(entry), Some(execution)) = (&entry, &execution) {
        let indicator_entry = !matches!(entry.signal, EntrySignal::Immediate);
        if indicator_entry && execution.fill_model == FillModel::Open && entry.delay == 0 {
            reasons.push(RejectionReason::SameCandleLookahead);
        }
    }

    match (entry, execution, exits) {
        (Some(entry), Some(execution), Some(exits)) if reasons.is_empty() => Ok(StrategyPlan {
            name: config.name.clone(),
            entry,
            execution,
            exits,
        }),
        _ => Err(PlanRejected { reasons }),
    }
}

fn compile_entry(cfg: &EntryConfig, reasons: &mut Vec<RejectionReason>) -> Option<EntryPlan> {
    let before = reasons.len();

    let delay = match cfg.delay_candles {
        None => 0,
        Some(d) if d < 0 => {
            reasons.push(RejectionReason::NegativeDelay { value: d });
            0
        }
        Some(d) => d as usize,
    };

    let mode = cfg.mode.trim().to_ascii_lowercase();
    let signal = match mode.as_str() {
        "immediate" => Some(EntrySignal::Immediate),
        "indicator_threshold" => {
            let series = required_series(cfg.series.as_deref(), "series", &mode, reasons);
            let comparison = match cfg.comparison.as_deref() {
                None => {
                    reasons.push(missing(&mode, "comparison"));
                    None
                }
                Some(c) => parse_comparison(c).or_else(|| {
                    reasons.push(RejectionReason::UnknownComparison {
                        comparison: c.to_string(),
                    });
                    None
                }),
            };
            let level = match cfg.threshold {
                None => {
                    reasons.push(missing(&mode, "threshold"));
                    None
                }
                Some(v) if !v.is_finite() => {
                    reasons.push(RejectionReason::NonFiniteThreshold { value: v });
                    None
                }
                Some(v) => Some(v),
            };
            match (series, comparison, level) {
                (Some(series), Some(comparison), Some(level)) => {
                    Some(EntrySignal::IndicatorThreshold {
                        series,
                        comparison,
                        level,
                    })
                }
                _ => None,
            }
        }
        "indicator_cross" => {
            let fast = required_series(cfg.fast.as_deref(), "fast", &mode, reasons);
            let slow = required_series(cfg.slow.as_deref(), "slow", &mode, reasons);
            let direction = match cfg.direction.as_deref() {
                None => {
                    reasons.push(missing(&mode, "direction"));
                    None
                }
                Some(d) => parse_direction(d).or_else(|| {
                    reasons.push(RejectionReason::UnknownCrossDirection {
                        direction: d.to_string(),
                    });
                    None
                }),
            };
            if let (Some(f), Some(s)) = (fast, slow) {
                if f == s {
                    reasons.push(RejectionReason::IdenticalCrossSeries { series: f.name() });
                }
            }
            match (fast, slow, direction) {
                (Some(fast), Some(slow), Some(direction)) => Some(EntrySignal::IndicatorCross {
                    fast,
                    slow,
                    direction,
                }),
                _ => None,
            }
        }
        _ => {
            reasons.push(RejectionReason::UnknownEntryMode {
                mode: cfg.mode.clone(),
            });
            None
        }
    };

    match signal {
        Some(signal) if reasons.len() == before => Some(EntryPlan { signal, delay }),
        _ => None,
    }
}

fn compile_execution(
    cfg: &ExecutionConfig,
    reasons: &mut Vec<RejectionReason>,
) -> Option<ExecutionPlan> {
    let before = reasons.len();

    let fill_model = match cfg.fill_model.trim().to_ascii_lowercase().as_str() {
        "open" => Some(FillModel::Open),
        "close" => Some(FillModel::Close),
        _ => {
            reasons.push(RejectionReason::UnknownFillModel {
                model: cfg.fill_model.clone(),
            });
            None
        }
    };

    let mut costs_valid = true;
    for (field, value) in [("fee_bps", cfg.fee_bps), ("slippage_bps", cfg.slippage_bps)] {
        if !(value >= 0.0) || !value.is_finite() {
            costs_valid = false;
            reasons.push(RejectionReason::NegativeCost {
                field: field.to_string(),
                value,
            });
        }
    }
    let total_bps = cfg.fee_bps + cfg.slippage_bps;
    if costs_valid && total_bps >= MAX_COST_BPS {
        reasons.push(RejectionReason::CostTooHigh { total_bps });
    }

    match fill_model {
        Some(fill_model) if reasons.len() == before => Some(ExecutionPlan {
            fill_model,
            costs: CostModel::new(cfg.fee_bps, cfg.slippage_bps),
        }),
        _ => None,
    }
}

fn compile_exits(cfg: &ExitConfig, reasons: &mut Vec<RejectionReason>) -> Option<ExitPlan> {
    let before = reasons.len();

    let has_exit = !cfg.targets.is_empty()
        || cfg.stop_loss_pct.is_some()
        || cfg.trailing.is_some()
        || cfg.max_candles_in_trade.is_some();
    if !has_exit {
        reasons.push(RejectionReason::NoExitPath);
    }

    // Ladder
    for (index, t) in cfg.targets.iter().enumerate() {
        for (field, value) in [("size_pct", t.size_pct), ("profit_pct", t.profit_pct)] {
            if !(value > 0.0) || !value.is_finite() {
                reasons.push(RejectionReason::InvalidTarget {
                    index,
                    field: field.to_string(),
                    value,
                });
            }
        }
    }
    let total: f64 = cfg.targets.iter().map(|t| t.size_pct).sum();
    if total > 100.0 + LADDER_TOLERANCE {
        reasons.push(RejectionReason::LadderOverflow { total });
    }

    // Stop loss
    if let Some(pct) = cfg.stop_loss_pct {
        if !(pct > 0.0) {
            reasons.push(non_positive("stop_loss_pct", pct));
        } else if pct >= 100.0 {
            reasons.push(RejectionReason::StopTooWide { value: pct });
        }
    }

    // Trailing
    if let Some(trailing) = &cfg.trailing {
        if !(trailing.trail_pct > 0.0) {
            reasons.push(non_positive("trailing.trail_pct", trailing.trail_pct));
        } else if trailing.trail_pct >= 100.0 {
            reasons.push(RejectionReason::TrailTooWide {
                value: trailing.trail_pct,
            });
        }
        if !(trailing.activate_profit_pct > 0.0) || !trailing.activate_profit_pct.is_finite() {
            reasons.push(non_positive(
                "trailing.activate_profit_pct",
                trailing.activate_profit_pct,
            ));
        }
        if trailing.breakeven_after_first_target && cfg.targets.is_empty() {
            reasons.push(RejectionReason::BreakevenWithoutTargets);
        }
    }

    // Time exit
    let max_candles = match cfg.max_candles_in_trade {
        Some(n) if n <= 0 => {
            reasons.push(non_positive("max_candles_in_trade", n as f64));
            None
        }
        other => other.map(|n| n as usize),
    };

    if reasons.len() != before {
        return None;
    }

    let mut ladder: Vec<Target> = cfg
        .targets
        .iter()
        .map(|t| Target {
            size_pct: t.size_pct,
            profit_pct: t.profit_pct,
        })
        .collect();
    // Stable: equal profit levels keep their authored order.
    ladder.sort_by(|a, b| a.profit_pct.total_cmp(&b.profit_pct));

    Some(ExitPlan {
        ladder,
        stop_loss_pct: cfg.stop_loss_pct,
        trailing: cfg.trailing.map(|t| TrailingPlan {
            trail_pct: t.trail_pct,
            activate_profit_pct: t.activate_profit_pct,
            breakeven_after_first_target: t.breakeven_after_first_target,
        }),
        max_candles_in_trade: max_candles,
    })
}

fn required_series(
    raw: Option<&str>,
    field: &str,
    mode: &str,
    reasons: &mut Vec<RejectionReason>,
) -> Option<Series> {
    let Some(raw) = raw else {
        reasons.push(missing(mode, field));
        return None;
    };
    match Series::parse(raw) {
        Ok(s) => Some(s),
        Err(e) => {
            reasons.push(RejectionReason::UnknownSeries {
                field: field.to_string(),
                detail: e.to_string(),
            });
            None
        }
    }
}

fn parse_comparison(raw: &str) -> Option<Comparison> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "above" => Some(Comparison::Above),
        "below" => Some(Comparison::Below),
        _ => None,
    }
}

fn parse_direction(raw: &str) -> Option<CrossDirection> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "up" => Some(CrossDirection::Up),
        "down" => Some(CrossDirection::Down),
        _ => None,
    }
}

fn missing(mode: &str, param: &str) -> RejectionReason {
    RejectionReason::MissingEntryParam {
        mode: mode.to_string(),
        param: param.to_string(),
    }
}

fn non_positive(field: &str, value: f64) -> RejectionReason {
    RejectionReason::NonPositive {
        field: field.to_string(),
        value,
    }
}
