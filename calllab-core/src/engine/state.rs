//! Run result and error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{DataIntegrityError, Event, EventKind, TradeSummary};
use crate::fingerprint::{output_digest, OutputDigest};

/// Everything one simulation run produced. Plain data, no external references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub events: Vec<Event>,
    /// Absent when no entry fired.
    pub summary: Option<TradeSummary>,
}

impl SimulationResult {
    pub fn entered(&self) -> bool {
        self.summary.is_some()
    }

    /// blake3 digest of the canonical JSON of this result.
    pub fn digest(&self) -> OutputDigest {
        output_digest(self)
    }

    pub fn events_of(&self, kind: EventKind) -> impl Iterator<Item = &Event> {
        self.events.iter().filter(move |e| e.kind == kind)
    }
}

/// Why a run produced no result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error(transparent)]
    DataIntegrity(#[from] DataIntegrityError),

    #[error("simulation cancelled before candle {at_index}")]
    Cancelled { at_index: usize },
}
