//! Cost model — fee and slippage applied to every fill.
//!
//! Costs are directional: buyers pay more (higher price), sellers receive
//! less (lower price). Fee and slippage are both in basis points and are
//! combined into a single per-side fraction.

use serde::{Deserialize, Serialize};

/// Cost model for execution friction (fee + slippage).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    /// Exchange/venue fee in basis points per side.
    pub fee_bps: f64,
    /// Slippage in basis points, applied directionally.
    pub slippage_bps: f64,
}

impl CostModel {
    pub fn new(fee_bps: f64, slippage_bps: f64) -> Self {
        Self {
            fee_bps,
            slippage_bps,
        }
    }

    pub fn frictionless() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Total per-side friction as a fraction of price.
    pub fn friction(&self) -> f64 {
        (self.fee_bps + self.slippage_bps) / 10_000.0
    }

    /// Fill price for a buy at `price`.
    pub fn buy_fill(&self, price: f64) -> f64 {
        price * (1.0 + self.friction())
    }

    /// Fill price for a sell at `price`.
    pub fn sell_fill(&self, price: f64) -> f64 {
        price * (1.0 - self.friction())
    }
}

impl Default for CostModel {
    fn default() -> Self {
        Self::frictionless()
    }
}
