//! # error
//!
//! Centralised application error type.
//!
//! Nothing in this taxonomy is process-fatal: `DataUnavailable` means "skip
//! the symbol this scan", `Persistence` means "logged, carry on" (a duplicate
//! alert after a restart is the accepted cost of a lost history write).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatchError {
    /// Candle fetch failed, or the exchange returned an empty/malformed
    /// series. Recovered by skipping the affected symbol for the scan.
    #[error("market data unavailable for {symbol} {interval}: {reason}")]
    DataUnavailable {
        symbol: String,
        interval: &'static str,
        reason: String,
    },

    /// Transport-level failure talking to the exchange.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Alert history could not be written to disk. Non-fatal.
    #[error("alert history persistence failed: {0}")]
    Persistence(#[from] std::io::Error),
}

impl WatchError {
    pub fn unavailable(symbol: &str, interval: &'static str, reason: impl Into<String>) -> Self {
        Self::DataUnavailable {
            symbol: symbol.to_string(),
            interval,
            reason: reason.into(),
        }
    }
}
