//! Fingerprints — deterministic identities for plans and run outputs.
//!
//! - `PlanHash`: blake3 over the canonical JSON of a compiled plan. Two configs
//!   that compile to the same plan (e.g. ladders authored in a different
//!   order) share a hash.
//! - `OutputDigest`: blake3 over the canonical JSON of a run's events and
//!   summary. Replaying the same inputs must reproduce it exactly.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::engine::SimulationResult;
use crate::plan::StrategyPlan;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlanHash(pub String);

impl fmt::Display for PlanHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputDigest(pub String);

impl fmt::Display for OutputDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub fn plan_hash(plan: &StrategyPlan) -> PlanHash {
    PlanHash(canonical_hash(plan))
}

pub fn output_digest(result: &SimulationResult) -> OutputDigest {
    OutputDigest(canonical_hash(result))
}

/// Struct fields serialize in declaration order and no map in these types
/// has non-string keys, so the JSON is canonical and cannot fail.
fn canonical_hash<T: Serialize>(value: &T) -> String {
    let json = serde_json::to_vec(value).expect("plan and result types must serialize");
    blake3::hash(&json).to_hex().to_string()
}
