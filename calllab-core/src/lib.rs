//! CallLab Core — deterministic candle-replay simulation of trading signals.
//!
//! This crate contains the engine:
//! - Domain types (candles, events, the open position, trade summaries)
//! - Causal RSI/EMA indicators, incremental and prefix forms
//! - Strategy compiler: raw config in, immutable tagged-variant plan out
//! - Entry evaluator with delay semantics
//! - Exit resolver with the open → low → high → close intrabar policy
//! - Fee/slippage cost model
//! - Simulation driver and blake3 fingerprints of plans and outputs
//!
//! Same candles + same plan always produce the same events, summary and
//! digest. Nothing here touches the clock, the filesystem or a global.

pub mod domain;
pub mod engine;
pub mod fingerprint;
pub mod indicators;
pub mod plan;

pub use engine::{run, run_with_cancel, SimulationError, SimulationResult};
pub use plan::{compile, PlanRejected, StrategyConfig, StrategyPlan};
