//! # levels — Daily Pivot Levels
//!
//! Classic floor-trader pivots derived from the previous completed daily
//! candle, plus the proximity predicate the scoring engine uses to detect
//! confluence with support/resistance.

use crate::market::Candle;

/// Pivot point and the first two support/resistance levels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PivotLevels {
    pub pivot: f64,
    pub r1: f64,
    pub r2: f64,
    pub s1: f64,
    pub s2: f64,
}

impl PivotLevels {
    /// Compute from the prior day's high/low/close.
    pub fn from_daily(high: f64, low: f64, close: f64) -> Self {
        let pivot = (high + low + close) / 3.0;
        Self {
            pivot,
            r1: 2.0 * pivot - low,
            s1: 2.0 * pivot - high,
            r2: pivot + (high - low),
            s2: pivot - (high - low),
        }
    }

    pub fn from_candle(candle: &Candle) -> Self {
        Self::from_daily(candle.high, candle.low, candle.close)
    }

    /// Price sits within the tolerance band of S1 or S2.
    pub fn near_support(&self, price: f64, tolerance: f64) -> bool {
        is_near(price, self.s1, tolerance) || is_near(price, self.s2, tolerance)
    }

    /// Price sits within the tolerance band of R1 or R2.
    pub fn near_resistance(&self, price: f64, tolerance: f64) -> bool {
        is_near(price, self.r1, tolerance) || is_near(price, self.r2, tolerance)
    }
}

/// Level-relative proximity: `|price − level| ≤ tolerance · level`.
/// Symmetric on both sides of the level, inclusive at the boundary.
pub fn is_near(price: f64, level: f64, tolerance: f64) -> bool {
    (price - level).abs() <= tolerance * level
}

// ─── Tests ────────────────────────────────────────────────────────────────────
