//! # config — Environment-Driven Configuration
//!
//! Everything operational is injected through environment variables with
//! sensible defaults, loaded once at startup. Sub-policies that belong to a
//! specific engine (`ScoreWeights`, `RiskParams`) keep their own `from_env`
//! next to their logic; this module owns the shared knobs and the parse
//! helpers.

use std::path::PathBuf;
use std::time::Duration;

use crate::risk::RiskParams;
use crate::scoring::ScoreWeights;

// ─── Env Helpers ──────────────────────────────────────────────────────────────

pub(crate) fn env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

pub(crate) fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

pub(crate) fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

pub(crate) fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v != "false" && v != "0")
        .unwrap_or(default)
}

// ─── Indicator Periods ────────────────────────────────────────────────────────

/// Fixed lookback periods for the indicator pipeline.
#[derive(Debug, Clone)]
pub struct IndicatorPeriods {
    pub rsi: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub adx: usize,
    pub ema_short: usize,
    pub ema_long: usize,
    pub sma: usize,
    pub bollinger: usize,
    pub bollinger_mult: f64,
    pub atr: usize,
    /// Fast-timeframe candles averaged for the volume baseline.
    pub volume_lookback: usize,
}

impl Default for IndicatorPeriods {
    fn default() -> Self {
        Self {
            rsi: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            adx: 14,
            ema_short: 50,
            ema_long: 200,
            sma: 21,
            bollinger: 20,
            bollinger_mult: 2.0,
            atr: 14,
            volume_lookback: 10,
        }
    }
}

impl IndicatorPeriods {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            rsi: env_usize("RSI_PERIOD", d.rsi),
            macd_fast: env_usize("MACD_FAST_PERIOD", d.macd_fast),
            macd_slow: env_usize("MACD_SLOW_PERIOD", d.macd_slow),
            macd_signal: env_usize("MACD_SIGNAL_PERIOD", d.macd_signal),
            adx: env_usize("ADX_PERIOD", d.adx),
            ema_short: env_usize("EMA_SHORT_PERIOD", d.ema_short),
            ema_long: env_usize("EMA_LONG_PERIOD", d.ema_long),
            sma: env_usize("SMA_PERIOD", d.sma),
            bollinger: env_usize("BOLLINGER_PERIOD", d.bollinger),
            bollinger_mult: env_f64("BOLLINGER_STDDEV", d.bollinger_mult),
            atr: env_usize("ATR_PERIOD", d.atr),
            volume_lookback: env_usize("VOLUME_LOOKBACK", d.volume_lookback),
        }
    }
}

// ─── Telegram ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub token: String,
    pub chat_id: String,
}

// ─── Config ───────────────────────────────────────────────────────────────────

/// Default scan universe, matching the deployed watch list.
const DEFAULT_SYMBOLS: &str = "BTCUSDT,ETHUSDT,BNBUSDT,XRPUSDT,ADAUSDT,SOLUSDT,\
    DOGEUSDT,DOTUSDT,LTCUSDT,AVAXUSDT,MATICUSDT,LINKUSDT";

#[derive(Debug, Clone)]
pub struct Config {
    /// Symbols scanned every tick.
    pub symbols: Vec<String>,
    /// Period of the scan loop.
    pub scan_interval: Duration,
    /// How long a cached candle series is served before refetch.
    pub candle_cache_ttl: Duration,
    /// Minimum gap between identical alerts per (symbol, direction).
    pub alert_cooldown: chrono::Duration,
    /// Level-relative tolerance for pivot proximity (0.005 = 0.5 %).
    pub pivot_tolerance: f64,
    /// Candles requested per fast/medium timeframe fetch.
    pub kline_limit: u32,
    /// Candles requested on the slow timeframe (must cover the long EMA).
    pub kline_limit_slow: u32,
    /// When set, a buy signal suppresses the sell check for the same tick
    /// (legacy buy-priority mode). Off by default: sides are independent.
    pub exclusive_direction: bool,
    pub history_path: PathBuf,
    pub binance_url: String,
    /// `None` → dry-run: alerts are logged instead of delivered.
    pub telegram: Option<TelegramConfig>,
    pub periods: IndicatorPeriods,
    pub weights: ScoreWeights,
    pub risk: RiskParams,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let symbols: Vec<String> = std::env::var("SYMBOLS")
            .unwrap_or_else(|_| DEFAULT_SYMBOLS.to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        anyhow::ensure!(!symbols.is_empty(), "SYMBOLS must name at least one symbol");

        let telegram = match (
            std::env::var("TELEGRAM_TOKEN").ok(),
            std::env::var("TELEGRAM_CHAT_ID").ok(),
        ) {
            (Some(token), Some(chat_id)) => Some(TelegramConfig { token, chat_id }),
            _ => None,
        };

        Ok(Self {
            symbols,
            scan_interval: Duration::from_secs(env_u64("SCAN_INTERVAL_SECS", 60)),
            candle_cache_ttl: Duration::from_secs(env_u64("CANDLE_CACHE_TTL_SECS", 240)),
            alert_cooldown: chrono::Duration::seconds(env_u64("ALERT_COOLDOWN_SECS", 900) as i64),
            pivot_tolerance: env_f64("PIVOT_TOLERANCE", 0.005),
            kline_limit: env_u32("KLINE_LIMIT", 100).min(1000),
            kline_limit_slow: env_u32("KLINE_LIMIT_SLOW", 300).min(1000),
            exclusive_direction: env_bool("EXCLUSIVE_DIRECTION", false),
            history_path: std::env::var("ALERT_HISTORY_FILE")
                .unwrap_or_else(|_| "alert_history.json".to_string())
                .into(),
            binance_url: std::env::var("BINANCE_API_URL")
                .unwrap_or_else(|_| "https://api.binance.com".to_string()),
            telegram,
            periods: IndicatorPeriods::from_env(),
            weights: ScoreWeights::from_env(),
            risk: RiskParams::from_env(),
        })
    }
}
