//! Domain types for CallLab

pub mod candle;
pub mod event;
pub mod position;
pub mod trade;

pub use candle::{validate_candles, Candle, DataIntegrityError, IntegrityViolation};
pub use event::{Event, EventKind};
pub use position::{Position, SIZE_EPSILON};
pub use trade::{ExitLeg, ExitReason, TradeSummary};
