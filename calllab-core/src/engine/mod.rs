//! Simulation engine — deterministic candle replay of one compiled plan.
//!
//! The engine consumes a validated candle slice and a [`StrategyPlan`]
//! and runs a single-threaded loop with no I/O and no shared state:
//!
//! 1. Flat: indicator update, entry evaluation, ENTRY fill
//! 2. In position: stop, targets, trailing, time (see [`execution::exit_resolver`])
//! 3. End of data: force-close anything still open
//!
//! [`StrategyPlan`]: crate::plan::StrategyPlan

pub mod entry;
pub mod execution;
pub mod loop_runner;
pub mod state;
pub mod trade_extraction;

pub use entry::{EntryEvaluator, EntryState};
pub use execution::{resolve_candle, CostModel};
pub use loop_runner::{run, run_with_cancel};
pub use state::{SimulationError, SimulationResult};
pub use trade_extraction::summarize;
