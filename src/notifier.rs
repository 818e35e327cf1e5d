//! # notifier — Telegram Alert Sink
//!
//! Best-effort, fire-and-forget delivery. A failed send is logged and never
//! propagates into the scoring/gating path. Without Telegram credentials the
//! notifier runs in dry-run mode and prints the alert instead.

use tracing::{error, info};

use crate::config::TelegramConfig;
use crate::risk::TradeLevels;
use crate::scoring::Direction;

/// Indicator readings echoed in the alert message.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlertContext {
    pub rsi_fast: Option<f64>,
    pub macd_medium: Option<f64>,
    pub macd_signal_medium: Option<f64>,
    pub adx_medium: Option<f64>,
}

/// Render the outbound message for one alert.
pub fn format_alert(
    symbol: &str,
    direction: Direction,
    levels: &TradeLevels,
    score: f64,
    ctx: &AlertContext,
) -> String {
    let (emoji, label) = match direction {
        Direction::Buy => ("🚀", "Buy"),
        Direction::Sell => ("⚠️", "Sell"),
    };

    let mut msg = format!(
        "{emoji} {label} signal for {symbol}\n\
         Entry: {:.6}\n\
         Stop Loss: {:.6}\n\
         Take Profit: {:.6}\n\
         Score: {score:.1}",
        levels.entry, levels.stop_loss, levels.take_profit,
    );

    let mut parts = Vec::new();
    if let Some(rsi) = ctx.rsi_fast {
        parts.push(format!("RSI(5m): {rsi:.1}"));
    }
    if let (Some(macd), Some(signal)) = (ctx.macd_medium, ctx.macd_signal_medium) {
        let cmp = if macd > signal { '>' } else { '<' };
        parts.push(format!("MACD(30m): {macd:.4} {cmp} {signal:.4}"));
    }
    if let Some(adx) = ctx.adx_medium {
        parts.push(format!("ADX(30m): {adx:.1}"));
    }
    if !parts.is_empty() {
        msg.push_str("\nIndicators: ");
        msg.push_str(&parts.join(", "));
    }

    msg
}

pub struct Notifier {
    client: reqwest::Client,
    telegram: Option<TelegramConfig>,
}

impl Notifier {
    pub fn new(client: reqwest::Client, telegram: Option<TelegramConfig>) -> Self {
        Self { client, telegram }
    }

    /// Deliver the message. Never returns an error: failures are logged here
    /// and the caller moves on.
    pub async fn send(&self, text: &str) {
        let Some(telegram) = &self.telegram else {
            info!("Telegram not configured — alert (dry-run):\n{text}");
            return;
        };

        if let Err(e) = self.post(telegram, text).await {
            error!(error = %e, "alert delivery failed");
        }
    }

    async fn post(&self, telegram: &TelegramConfig, text: &str) -> anyhow::Result<()> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", telegram.token);

        let resp = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "chat_id": telegram.chat_id,
                "text": text,
            }))
            .timeout(std::time::Duration::from_secs(5))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("telegram rejected message: HTTP {status}: {body}");
        }

        Ok(())
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_buy_alert() {
        let levels = TradeLevels {
            entry: 30000.123456,
            stop_loss: 29850.123456,
            take_profit: 30225.123456,
        };
        let ctx = AlertContext {
            rsi_fast: Some(27.4),
            macd_medium: Some(12.3456),
            macd_signal_medium: Some(10.1111),
            adx_medium: Some(31.2),
        };
        let msg = format_alert("BTCUSDT", Direction::Buy, &levels, 4.0, &ctx);
        assert!(msg.contains("Buy signal for BTCUSDT"));
        assert!(msg.contains("Entry: 30000.123456"));
        assert!(msg.contains("Stop Loss: 29850.123456"));
        assert!(msg.contains("Take Profit: 30225.123456"));
        assert!(msg.contains("Score: 4.0"));
        assert!(msg.contains("MACD(30m): 12.3456 > 10.1111"));
    }

    #[test]
    fn test_format_alert_omits_missing_indicators() {
        let levels = TradeLevels {
            entry: 1.0,
            stop_loss: 2.0,
            take_profit: 0.5,
        };
        let msg = format_alert(
            "XRPUSDT",
            Direction::Sell,
            &levels,
            3.5,
            &AlertContext::default(),
        );
        assert!(msg.contains("Sell signal"));
        assert!(!msg.contains("Indicators:"));
    }
}
