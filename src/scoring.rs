//! # scoring — Multi-Timeframe Score Fusion
//!
//! Fuses indicator readings from the fast (5m), medium (30m) and slow (4h)
//! timeframes — plus daily pivot confluence — into two independent
//! non-negative scores per symbol. The weight table is data, not branching
//! logic: every deployment tunes `ScoreWeights` through the environment
//! instead of forking the engine.
//!
//! ## Contribution rules
//! - Each directional signal feeds at most one side per observation.
//! - ADX and volume are directionless *boosters*: they reinforce whichever
//!   side already has partial confirmation, never originate one.
//! - Pivot confluence is confirmatory on the same terms.
//! - A missing indicator (pipeline returned no value) contributes zero.

use crate::config::{env_f64, env_usize};
use crate::indicators::{sustained, MacdPoint};

// ─── Direction ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Buy,
    Sell,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Buy => write!(f, "buy"),
            Direction::Sell => write!(f, "sell"),
        }
    }
}

// ─── Weight Table ─────────────────────────────────────────────────────────────

/// Scoring policy. Defaults are the validated reference profile; every knob
/// can be overridden per deployment via `SCORE_*` environment variables.
#[derive(Debug, Clone)]
pub struct ScoreWeights {
    /// Sustained oversold/overbought RSI on the fast timeframe.
    pub rsi_fast: f64,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    /// Consecutive fast candles the RSI condition must hold.
    pub rsi_confirm_candles: usize,
    /// Medium-timeframe MACD line vs signal line.
    pub macd_medium: f64,
    /// Price vs the long EMA on the slow timeframe.
    pub trend_alignment: f64,
    /// Slow-timeframe MACD and trend pointing the same way.
    pub mtf_agreement: f64,
    /// Proximity to a pivot support/resistance level (confirmatory).
    pub pivot_confluence: f64,
    /// Trend-strength booster, applied to sides already > 0.
    pub adx_boost: f64,
    pub adx_min: f64,
    /// Above-average volume booster, applied to sides already > 0.
    pub volume_boost: f64,
    pub volume_surge_ratio: f64,
    /// A side signals when its score reaches this value.
    pub threshold: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            rsi_fast: 1.5,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            rsi_confirm_candles: 3,
            macd_medium: 1.5,
            trend_alignment: 1.0,
            mtf_agreement: 1.0,
            pivot_confluence: 1.0,
            adx_boost: 0.5,
            adx_min: 25.0,
            volume_boost: 0.5,
            volume_surge_ratio: 1.2,
            threshold: 3.5,
        }
    }
}

impl ScoreWeights {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            rsi_fast: env_f64("SCORE_W_RSI", d.rsi_fast),
            rsi_oversold: env_f64("SCORE_RSI_OVERSOLD", d.rsi_oversold),
            rsi_overbought: env_f64("SCORE_RSI_OVERBOUGHT", d.rsi_overbought),
            rsi_confirm_candles: env_usize("SCORE_RSI_CONFIRM_CANDLES", d.rsi_confirm_candles),
            macd_medium: env_f64("SCORE_W_MACD", d.macd_medium),
            trend_alignment: env_f64("SCORE_W_TREND", d.trend_alignment),
            mtf_agreement: env_f64("SCORE_W_MTF", d.mtf_agreement),
            pivot_confluence: env_f64("SCORE_W_PIVOT", d.pivot_confluence),
            adx_boost: env_f64("SCORE_W_ADX", d.adx_boost),
            adx_min: env_f64("SCORE_ADX_MIN", d.adx_min),
            volume_boost: env_f64("SCORE_W_VOLUME", d.volume_boost),
            volume_surge_ratio: env_f64("SCORE_VOLUME_SURGE_RATIO", d.volume_surge_ratio),
            threshold: env_f64("SCORE_THRESHOLD", d.threshold),
        }
    }
}

// ─── Inputs ───────────────────────────────────────────────────────────────────

/// Last fast-timeframe volume against its recent average.
#[derive(Debug, Clone, Copy)]
pub struct VolumeRead {
    pub last: f64,
    pub average: f64,
}

/// Everything the fusion needs for one symbol, one tick. Optional fields are
/// `None` when the pipeline had insufficient history — their terms contribute
/// zero.
#[derive(Debug, Clone, Default)]
pub struct ScoreInputs {
    pub price: f64,
    /// Fast-timeframe RSI series tail (for the sustained-condition check).
    pub rsi_fast: Vec<f64>,
    pub macd_medium: Option<MacdPoint>,
    pub macd_slow: Option<MacdPoint>,
    pub adx_medium: Option<f64>,
    pub ema_slow: Option<f64>,
    pub volume_fast: Option<VolumeRead>,
    pub near_support: bool,
    pub near_resistance: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreResult {
    pub buy_score: f64,
    pub sell_score: f64,
}

// ─── Fusion ───────────────────────────────────────────────────────────────────

/// Compute both directional scores. Both sides may clear the threshold in the
/// same tick; the alert gate deduplicates per direction downstream.
pub fn score(inputs: &ScoreInputs, weights: &ScoreWeights) -> ScoreResult {
    let mut buy = 0.0;
    let mut sell = 0.0;

    // Fast RSI, confirmed across consecutive candles to filter noise.
    let n = weights.rsi_confirm_candles;
    if sustained(&inputs.rsi_fast, n, |&v| v < weights.rsi_oversold) {
        buy += weights.rsi_fast;
    }
    if sustained(&inputs.rsi_fast, n, |&v| v > weights.rsi_overbought) {
        sell += weights.rsi_fast;
    }

    // Medium-timeframe MACD crossover direction (histogram sign).
    if let Some(m) = inputs.macd_medium {
        if m.histogram > 0.0 {
            buy += weights.macd_medium;
        } else if m.histogram < 0.0 {
            sell += weights.macd_medium;
        }
    }

    // Trend alignment: price against the slow long EMA.
    if let Some(e) = inputs.ema_slow {
        if inputs.price > e {
            buy += weights.trend_alignment;
        } else if inputs.price < e {
            sell += weights.trend_alignment;
        }
    }

    // Multi-timeframe agreement: slow MACD and slow trend pointing together.
    if let (Some(m), Some(e)) = (inputs.macd_slow, inputs.ema_slow) {
        if m.macd > m.signal && inputs.price > e {
            buy += weights.mtf_agreement;
        }
        if m.macd < m.signal && inputs.price < e {
            sell += weights.mtf_agreement;
        }
    }

    // Pivot confluence confirms an existing lean, it never starts one.
    if inputs.near_support && buy > 0.0 {
        buy += weights.pivot_confluence;
    }
    if inputs.near_resistance && sell > 0.0 {
        sell += weights.pivot_confluence;
    }

    // Directionless boosters: trend strength and volume surge.
    let adx_strong = inputs.adx_medium.is_some_and(|a| a >= weights.adx_min);
    let volume_surge = inputs
        .volume_fast
        .is_some_and(|v| v.last > weights.volume_surge_ratio * v.average);

    if adx_strong {
        if buy > 0.0 {
            buy += weights.adx_boost;
        }
        if sell > 0.0 {
            sell += weights.adx_boost;
        }
    }
    if volume_surge {
        if buy > 0.0 {
            buy += weights.volume_boost;
        }
        if sell > 0.0 {
            sell += weights.volume_boost;
        }
    }

    ScoreResult {
        buy_score: buy,
        sell_score: sell,
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
