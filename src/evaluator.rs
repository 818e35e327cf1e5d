//! # evaluator — Per-Symbol Tick
//!
//! One evaluation: pull the timeframe batch through the cache, derive the
//! indicator snapshot and pivot levels, fuse the scores, and push qualifying
//! sides through the risk calculator and the alert gate.
//!
//! ```text
//! fetch (5m / 30m / 4h / 1d / 1m, concurrent)
//!   → indicators + pivot levels
//!   → buy/sell scores
//!   → per signaling side: ATR gate → SL/TP → fingerprint → cooldown gate → emit
//! ```
//!
//! Every failure here is per-symbol: the scheduler logs it and carries on
//! with the rest of the universe.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::alerts::{evaluate_gate, fingerprint, AlertHistory, AlertRecord, GateDecision};
use crate::candles::CandleStore;
use crate::config::Config;
use crate::error::WatchError;
use crate::indicators::{adx, atr, bollinger, ema, macd, rsi, sma};
use crate::levels::PivotLevels;
use crate::market::{closes, highs, lows, Interval};
use crate::notifier::{format_alert, AlertContext, Notifier};
use crate::risk::{trade_levels, RiskParams, TradeLevels};
use crate::scoring::{score, Direction, ScoreInputs, VolumeRead};

// ─── Side decision ────────────────────────────────────────────────────────────

/// Decision for one side of one tick, before any I/O happens.
#[derive(Debug, Clone, PartialEq)]
enum SideOutcome {
    /// Score below threshold; the side did not signal.
    BelowThreshold,
    /// Signaled, but no volatility anchor to derive SL/TP from.
    MissingAtr,
    /// Signaled and the gate permits emission.
    Emit {
        levels: TradeLevels,
        fingerprint: u64,
        reason: &'static str,
    },
    /// Signaled but the cooldown gate held it back.
    Suppressed { reason: &'static str },
}

/// Pure decision chain for one side: threshold, then the ATR precondition,
/// then SL/TP, fingerprint and the cooldown gate. No ATR is a hard stop — a
/// signal without derivable risk levels never reaches the channel.
#[allow(clippy::too_many_arguments)]
fn decide_side(
    side_score: f64,
    threshold: f64,
    price: f64,
    atr_value: Option<f64>,
    direction: Direction,
    risk: &RiskParams,
    prior: Option<&AlertRecord>,
    now: DateTime<Utc>,
    cooldown: chrono::Duration,
) -> SideOutcome {
    if side_score < threshold {
        return SideOutcome::BelowThreshold;
    }

    let Some(atr_value) = atr_value else {
        return SideOutcome::MissingAtr;
    };

    let levels = trade_levels(price, atr_value, direction, risk);
    let new_fingerprint = fingerprint(&levels);

    match evaluate_gate(prior, now, cooldown, new_fingerprint) {
        GateDecision::Permit { reason } => SideOutcome::Emit {
            levels,
            fingerprint: new_fingerprint,
            reason,
        },
        GateDecision::Deny { reason } => SideOutcome::Suppressed { reason },
    }
}

/// Legacy buy-priority mode: when exclusive, a signaling buy side
/// short-circuits the sell check for the tick.
fn sell_check_enabled(exclusive_direction: bool, buy_signaled: bool) -> bool {
    !(exclusive_direction && buy_signaled)
}

pub struct SymbolEvaluator {
    store: CandleStore,
    notifier: Notifier,
    config: Config,
}

impl SymbolEvaluator {
    pub fn new(store: CandleStore, notifier: Notifier, config: Config) -> Self {
        Self {
            store,
            notifier,
            config,
        }
    }

    /// Evaluate one symbol for the current tick.
    pub async fn evaluate(
        &self,
        symbol: &str,
        history: &mut AlertHistory,
    ) -> Result<(), WatchError> {
        let limit = self.config.kline_limit;

        // The timeframes are independent reads: fetch them concurrently, but
        // the whole batch lands before any scoring happens.
        let (fast, medium, slow, daily, spot) = tokio::try_join!(
            self.store.get(symbol, Interval::M5, limit),
            self.store.get(symbol, Interval::M30, limit),
            self.store.get(symbol, Interval::H4, self.config.kline_limit_slow),
            self.store.get(symbol, Interval::D1, 2),
            self.store.get(symbol, Interval::M1, 1),
        )?;

        let price = spot
            .last()
            .map(|c| c.close)
            .ok_or_else(|| WatchError::unavailable(symbol, "1m", "no spot candle"))?;

        let p = &self.config.periods;

        // ── Fast timeframe (5m) ───────────────────────────────────────────────
        let closes_fast = closes(&fast);
        let rsi_fast = rsi(&closes_fast, p.rsi);
        let sma_fast = sma(&closes_fast, p.sma).last().copied();
        let bb_fast = bollinger(&closes_fast, p.bollinger, p.bollinger_mult)
            .last()
            .copied();
        let volume_fast = if fast.len() >= p.volume_lookback {
            let tail = &fast[fast.len() - p.volume_lookback..];
            let average = tail.iter().map(|c| c.volume).sum::<f64>() / p.volume_lookback as f64;
            tail.last().map(|c| VolumeRead {
                last: c.volume,
                average,
            })
        } else {
            None
        };

        // ── Medium timeframe (30m) ────────────────────────────────────────────
        let closes_medium = closes(&medium);
        let highs_medium = highs(&medium);
        let lows_medium = lows(&medium);
        let ema_medium = ema(&closes_medium, p.ema_short).last().copied();
        let macd_medium = macd(&closes_medium, p.macd_fast, p.macd_slow, p.macd_signal)
            .last()
            .copied();
        let adx_medium = adx(&highs_medium, &lows_medium, &closes_medium, p.adx)
            .last()
            .copied();
        let atr_medium = atr(&highs_medium, &lows_medium, &closes_medium, p.atr)
            .last()
            .copied();

        // ── Slow timeframe (4h) ───────────────────────────────────────────────
        let closes_slow = closes(&slow);
        let macd_slow = macd(&closes_slow, p.macd_fast, p.macd_slow, p.macd_signal)
            .last()
            .copied();
        let ema_slow = ema(&closes_slow, p.ema_long).last().copied();

        // ── Daily pivots ──────────────────────────────────────────────────────
        // The last daily candle is still forming; pivots come from the one
        // before it. Without two candles the proximity flags stay off.
        let levels = (daily.len() >= 2).then(|| PivotLevels::from_candle(&daily[daily.len() - 2]));
        let near_support = levels
            .map(|l| l.near_support(price, self.config.pivot_tolerance))
            .unwrap_or(false);
        let near_resistance = levels
            .map(|l| l.near_resistance(price, self.config.pivot_tolerance))
            .unwrap_or(false);

        debug!(
            symbol,
            price,
            rsi_fast = ?rsi_fast.last(),
            sma_fast = ?sma_fast,
            bb_middle_fast = ?bb_fast.map(|b| b.middle),
            bb_width_fast = ?bb_fast.map(|b| b.upper - b.lower),
            ema_medium = ?ema_medium,
            macd_medium = ?macd_medium,
            adx_medium = ?adx_medium.map(|a| a.adx),
            plus_di = ?adx_medium.map(|a| a.plus_di),
            minus_di = ?adx_medium.map(|a| a.minus_di),
            atr_medium = ?atr_medium,
            ema_slow = ?ema_slow,
            pivot = ?levels.map(|l| l.pivot),
            near_support,
            near_resistance,
            "snapshot computed"
        );

        let inputs = ScoreInputs {
            price,
            rsi_fast: rsi_fast.clone(),
            macd_medium,
            macd_slow,
            adx_medium: adx_medium.map(|a| a.adx),
            ema_slow,
            volume_fast,
            near_support,
            near_resistance,
        };
        let result = score(&inputs, &self.config.weights);

        debug!(
            symbol,
            buy = result.buy_score,
            sell = result.sell_score,
            threshold = self.config.weights.threshold,
            "scores computed"
        );

        let ctx = AlertContext {
            rsi_fast: rsi_fast.last().copied(),
            macd_medium: macd_medium.map(|m| m.macd),
            macd_signal_medium: macd_medium.map(|m| m.signal),
            adx_medium: adx_medium.map(|a| a.adx),
        };

        let buy_signaled = self
            .maybe_alert(symbol, Direction::Buy, result.buy_score, price, atr_medium, &ctx, history)
            .await;

        if sell_check_enabled(self.config.exclusive_direction, buy_signaled) {
            self.maybe_alert(symbol, Direction::Sell, result.sell_score, price, atr_medium, &ctx, history)
                .await;
        }

        Ok(())
    }

    /// Run one side through the decision chain and act on the outcome.
    /// Returns whether the side signaled (threshold reached), independent of
    /// whether an alert was actually emitted.
    #[allow(clippy::too_many_arguments)]
    async fn maybe_alert(
        &self,
        symbol: &str,
        direction: Direction,
        side_score: f64,
        price: f64,
        atr_value: Option<f64>,
        ctx: &AlertContext,
        history: &mut AlertHistory,
    ) -> bool {
        let now = Utc::now();
        let outcome = decide_side(
            side_score,
            self.config.weights.threshold,
            price,
            atr_value,
            direction,
            &self.config.risk,
            history.record_for(symbol, direction),
            now,
            self.config.alert_cooldown,
        );

        match outcome {
            SideOutcome::BelowThreshold => false,
            SideOutcome::MissingAtr => {
                warn!(symbol, %direction, score = side_score,
                    "signal suppressed: no ATR available for SL/TP");
                true
            }
            SideOutcome::Emit {
                levels,
                fingerprint,
                reason,
            } => {
                info!(symbol, %direction, score = side_score, reason, "🚨 emitting alert");

                let msg = format_alert(symbol, direction, &levels, side_score, ctx);
                self.notifier.send(&msg).await;

                // The alert is considered sent even if the flush fails:
                // a duplicate after restart beats re-spamming now.
                let record = AlertRecord {
                    timestamp: now,
                    fingerprint,
                };
                if let Err(e) = history.record(symbol, direction, record) {
                    warn!(symbol, %direction, error = %e, "alert history flush failed");
                }
                true
            }
            SideOutcome::Suppressed { reason } => {
                debug!(symbol, %direction, score = side_score, reason, "alert suppressed");
                true
            }
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn decide(
        side_score: f64,
        atr_value: Option<f64>,
        prior: Option<&AlertRecord>,
    ) -> SideOutcome {
        decide_side(
            side_score,
            3.5,
            30000.0,
            atr_value,
            Direction::Buy,
            &RiskParams::default(),
            prior,
            Utc::now(),
            Duration::minutes(15),
        )
    }

    #[test]
    fn test_below_threshold_does_not_signal() {
        assert_eq!(decide(3.0, Some(150.0), None), SideOutcome::BelowThreshold);
    }

    #[test]
    fn test_missing_atr_suppresses_signaling_side() {
        assert_eq!(decide(5.0, None, None), SideOutcome::MissingAtr);
    }

    #[test]
    fn test_first_alert_emits_with_levels() {
        let outcome = decide(5.0, Some(150.0), None);
        let SideOutcome::Emit { levels, .. } = outcome else {
            panic!("expected emission, got {outcome:?}");
        };
        assert_eq!(levels.entry, 30000.0);
        assert_eq!(levels.stop_loss, 29850.0);
        assert_eq!(levels.take_profit, 30225.0);
    }

    #[test]
    fn test_unchanged_setup_inside_cooldown_is_suppressed() {
        // First pass yields the fingerprint the gate will compare against.
        let SideOutcome::Emit { fingerprint, .. } = decide(5.0, Some(150.0), None) else {
            panic!("expected emission");
        };

        let prior = AlertRecord {
            timestamp: Utc::now() - Duration::minutes(5),
            fingerprint,
        };
        assert!(matches!(
            decide(5.0, Some(150.0), Some(&prior)),
            SideOutcome::Suppressed { .. }
        ));

        // A different recorded setup re-alerts inside the cooldown.
        let prior = AlertRecord {
            timestamp: prior.timestamp,
            fingerprint: fingerprint ^ 1,
        };
        assert!(matches!(
            decide(5.0, Some(150.0), Some(&prior)),
            SideOutcome::Emit { .. }
        ));
    }

    #[test]
    fn test_buy_priority_short_circuits_sell() {
        assert!(!sell_check_enabled(true, true));
        assert!(sell_check_enabled(true, false));
        assert!(sell_check_enabled(false, true));
        assert!(sell_check_enabled(false, false));
    }
}
