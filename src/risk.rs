//! # risk — ATR-Anchored Stop-Loss / Take-Profit
//!
//! Derives the exit levels for an alert from the entry price and the current
//! ATR. Without an ATR there is no volatility anchor and the evaluator must
//! suppress the alert entirely — that precondition is enforced at the call
//! site, not here.
//!
//! All three values are rounded to a fixed precision before they are compared
//! or displayed, so floating-point jitter cannot defeat the fingerprint-based
//! dedup in the alert gate.

use crate::config::env_f64;
use crate::scoring::Direction;

/// Decimal places used for every emitted price.
pub const PRICE_DECIMALS: u32 = 6;

/// ATR multiples for the stop-loss and take-profit distances.
#[derive(Debug, Clone)]
pub struct RiskParams {
    pub sl_atr_mult: f64,
    pub tp_atr_mult: f64,
}

impl Default for RiskParams {
    fn default() -> Self {
        Self {
            sl_atr_mult: 1.0,
            tp_atr_mult: 1.5,
        }
    }
}

impl RiskParams {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            sl_atr_mult: env_f64("RISK_SL_ATR", d.sl_atr_mult),
            tp_atr_mult: env_f64("RISK_TP_ATR", d.tp_atr_mult),
        }
    }
}

/// Entry and exit levels for one alert, rounded to `PRICE_DECIMALS`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeLevels {
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

/// Derive SL/TP from the entry, the ATR and the trade direction.
pub fn trade_levels(entry: f64, atr: f64, direction: Direction, params: &RiskParams) -> TradeLevels {
    let sl_distance = params.sl_atr_mult * atr;
    let tp_distance = params.tp_atr_mult * atr;

    let (stop_loss, take_profit) = match direction {
        Direction::Buy => (entry - sl_distance, entry + tp_distance),
        Direction::Sell => (entry + sl_distance, entry - tp_distance),
    };

    TradeLevels {
        entry: round_price(entry),
        stop_loss: round_price(stop_loss),
        take_profit: round_price(take_profit),
    }
}

/// Round to `PRICE_DECIMALS` decimal places.
pub fn round_price(value: f64) -> f64 {
    let factor = 10f64.powi(PRICE_DECIMALS as i32);
    (value * factor).round() / factor
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buy_reference_scenario() {
        let levels = trade_levels(30000.123456, 150.0, Direction::Buy, &RiskParams::default());
        assert_eq!(levels.entry, 30000.123456);
        assert_eq!(levels.stop_loss, 29850.123456);
        assert_eq!(levels.take_profit, 30225.123456);
    }

    #[test]
    fn test_buy_ordering_invariant() {
        let levels = trade_levels(42.5, 0.8, Direction::Buy, &RiskParams::default());
        assert!(levels.stop_loss < levels.entry);
        assert!(levels.entry < levels.take_profit);
    }

    #[test]
    fn test_sell_ordering_invariant() {
        let levels = trade_levels(42.5, 0.8, Direction::Sell, &RiskParams::default());
        assert!(levels.take_profit < levels.entry);
        assert!(levels.entry < levels.stop_loss);
    }

    #[test]
    fn test_rounding_to_six_places() {
        assert_eq!(round_price(1.2345674), 1.234567);
        assert_eq!(round_price(1.2345678), 1.234568);
        assert_eq!(round_price(100.0), 100.0);
    }
}
