//! Execution — fill pricing and intrabar exit resolution.
//!
//! Both halves are stateless: the cost model is pure configuration, and the
//! exit resolver borrows the position for exactly one candle.

pub mod cost_model;
pub mod exit_resolver;

pub use cost_model::CostModel;
pub use exit_resolver::resolve_candle;
