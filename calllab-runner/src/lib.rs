//! CallLab Runner — everything around the engine that touches the outside.
//!
//! This crate builds on `calllab-core` to provide:
//! - Strategy and sweep-grid config loading (TOML or JSON)
//! - CSV candle loading/saving and seeded synthetic candle series
//! - Parallel parameter sweeps over many tokens with cooperative cancellation

pub mod config;
pub mod data_loader;
pub mod sweep;

pub use config::{load_grid, load_strategy, ConfigError, ConfigFormat, ParamGrid};
pub use data_loader::{
    load_token, load_tokens, save_candles, synthetic_candles, token_seed, LoadError,
    TokenCandles,
};
pub use sweep::{
    expand_grid, run_sweep, JobStatus, RejectedVariant, SweepError, SweepOptions, SweepOutcome,
    SweepReport, Variant,
};
