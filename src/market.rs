//! # market — Binance Kline Client
//!
//! Thin wrapper around the Binance REST klines endpoint. The exchange returns
//! positional rows; only the 7 leading fields are consumed:
//!
//! ```text
//! [openTime, open, high, low, close, volume, closeTime, ...]
//! ```
//!
//! Price fields arrive as JSON strings, so parsing tolerates both string and
//! numeric encodings. Anything shorter or non-numeric is rejected as
//! `DataUnavailable` — callers skip the symbol, never crash.

use serde_json::Value;

use crate::error::WatchError;

// ─── Interval ─────────────────────────────────────────────────────────────────

/// Candle interval supported by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interval {
    M1,
    M5,
    M30,
    H4,
    D1,
}

impl Interval {
    /// Wire format expected by the Binance klines endpoint.
    pub fn as_str(self) -> &'static str {
        match self {
            Interval::M1 => "1m",
            Interval::M5 => "5m",
            Interval::M30 => "30m",
            Interval::H4 => "4h",
            Interval::D1 => "1d",
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Candle ───────────────────────────────────────────────────────────────────

/// One OHLCV candle. Immutable once fetched; series are ordered ascending by
/// `open_time`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub close_time: i64,
}

impl Candle {
    /// Parse one positional kline row. Returns `None` when the row is too
    /// short or a field fails to parse.
    pub fn from_kline_row(row: &[Value]) -> Option<Self> {
        if row.len() < 7 {
            return None;
        }
        Some(Self {
            open_time: row[0].as_i64()?,
            open: field_f64(&row[1])?,
            high: field_f64(&row[2])?,
            low: field_f64(&row[3])?,
            close: field_f64(&row[4])?,
            volume: field_f64(&row[5])?,
            close_time: row[6].as_i64()?,
        })
    }

    /// Open and close both sit inside the high/low range.
    pub fn is_coherent(&self) -> bool {
        self.low <= self.open
            && self.open <= self.high
            && self.low <= self.close
            && self.close <= self.high
    }
}

/// Binance encodes prices as strings ("67000.12"); accept raw numbers too.
fn field_f64(v: &Value) -> Option<f64> {
    v.as_f64().or_else(|| v.as_str()?.parse().ok())
}

/// Column extractors shared by the indicator pipeline.
pub fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}
pub fn highs(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.high).collect()
}
pub fn lows(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.low).collect()
}

// ─── Client ───────────────────────────────────────────────────────────────────

/// REST client for the klines endpoint. One shared `reqwest::Client`
/// underneath; base URL is injectable for tests and mirrors.
#[derive(Debug, Clone)]
pub struct BinanceClient {
    client: reqwest::Client,
    base_url: String,
}

impl BinanceClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Fetch up to `limit` candles, ascending by open time.
    pub async fn fetch_klines(
        &self,
        symbol: &str,
        interval: Interval,
        limit: u32,
    ) -> Result<Vec<Candle>, WatchError> {
        let url = format!("{}/api/v3/klines", self.base_url);

        let rows: Vec<Vec<Value>> = self
            .client
            .get(&url)
            .query(&[
                ("symbol", symbol),
                ("interval", interval.as_str()),
                ("limit", &limit.to_string()),
            ])
            .timeout(std::time::Duration::from_secs(5))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if rows.is_empty() {
            return Err(WatchError::unavailable(
                symbol,
                interval.as_str(),
                "exchange returned an empty series",
            ));
        }

        let candles: Vec<Candle> = rows
            .iter()
            .map(|row| Candle::from_kline_row(row))
            .collect::<Option<_>>()
            .ok_or_else(|| {
                WatchError::unavailable(symbol, interval.as_str(), "malformed kline row")
            })?;

        // Series contract: ascending by open time, no interleaving.
        if candles.windows(2).any(|w| w[0].open_time >= w[1].open_time) {
            return Err(WatchError::unavailable(
                symbol,
                interval.as_str(),
                "series not ascending by open time",
            ));
        }

        if candles.iter().any(|c| !c.is_coherent()) {
            return Err(WatchError::unavailable(
                symbol,
                interval.as_str(),
                "incoherent ohlc row",
            ));
        }

        Ok(candles)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_row() -> Vec<Value> {
        vec![
            json!(1700000000000i64),
            json!("67000.5"),
            json!("67100.0"),
            json!("66900.25"),
            json!("67050.0"),
            json!("123.456"),
            json!(1700000299999i64),
            json!("ignored-trailing-field"),
        ]
    }

    #[test]
    fn test_parse_kline_row() {
        let candle = Candle::from_kline_row(&make_row()).unwrap();
        assert_eq!(candle.open_time, 1700000000000);
        assert_eq!(candle.open, 67000.5);
        assert_eq!(candle.high, 67100.0);
        assert_eq!(candle.low, 66900.25);
        assert_eq!(candle.close, 67050.0);
        assert_eq!(candle.volume, 123.456);
        assert_eq!(candle.close_time, 1700000299999);
    }

    #[test]
    fn test_parse_numeric_fields() {
        let mut row = make_row();
        row[4] = json!(67050.0); // number instead of string
        let candle = Candle::from_kline_row(&row).unwrap();
        assert_eq!(candle.close, 67050.0);
    }

    #[test]
    fn test_reject_short_row() {
        let row = make_row()[..5].to_vec();
        assert!(Candle::from_kline_row(&row).is_none());
    }

    #[test]
    fn test_reject_garbage_price() {
        let mut row = make_row();
        row[2] = json!("not-a-price");
        assert!(Candle::from_kline_row(&row).is_none());
    }

    #[test]
    fn test_coherent_ohlc_range() {
        let candle = Candle::from_kline_row(&make_row()).unwrap();
        assert!(candle.is_coherent());

        // Close above the high is impossible data.
        let mut row = make_row();
        row[4] = json!("68000.0");
        let candle = Candle::from_kline_row(&row).unwrap();
        assert!(!candle.is_coherent());

        // So is an open below the low.
        let mut row = make_row();
        row[1] = json!("66000.0");
        let candle = Candle::from_kline_row(&row).unwrap();
        assert!(!candle.is_coherent());
    }

    #[test]
    fn test_interval_wire_format() {
        assert_eq!(Interval::M5.as_str(), "5m");
        assert_eq!(Interval::H4.as_str(), "4h");
        assert_eq!(Interval::D1.to_string(), "1d");
    }
}
