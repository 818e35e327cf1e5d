//! # candlewatch — Multi-Timeframe TA Alert Scanner
//!
//! ## Flow
//! ```text
//! loop every SCAN_INTERVAL_SECS:
//!   for each symbol:
//!     1. Fetch candles (5m / 30m / 4h / 1d / 1m) through the TTL cache
//!     2. Compute indicators + daily pivot levels
//!     3. Fuse buy/sell scores across timeframes
//!     4. Threshold + ATR gate → SL/TP → cooldown/fingerprint gate
//!     5. Emit Telegram alert, persist alert history
//! ```

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod alerts;
mod candles;
mod config;
mod error;
mod evaluator;
mod indicators;
mod levels;
mod market;
mod notifier;
mod risk;
mod scheduler;
mod scoring;

use alerts::AlertHistory;
use candles::CandleStore;
use config::Config;
use evaluator::SymbolEvaluator;
use market::BinanceClient;
use notifier::Notifier;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env()
                .add_directive("candlewatch=debug".parse()?)
                .add_directive("reqwest=warn".parse()?),
        )
        .init();

    tracing::info!(
        r#"

  ╔═══════════════════════════════════════════╗
  ║   CANDLEWATCH — TA Signal Scanner         ║
  ╚═══════════════════════════════════════════╝"#
    );

    let config = Config::from_env().context("Failed to load config")?;
    let client = reqwest::Client::new();

    tracing::info!(
        symbols   = config.symbols.len(),
        interval  = ?config.scan_interval,
        threshold = config.weights.threshold,
        cooldown  = %config.alert_cooldown,
        telegram  = config.telegram.is_some(),
        "candlewatch started"
    );

    let store = CandleStore::new(
        BinanceClient::new(client.clone(), config.binance_url.clone()),
        config.candle_cache_ttl,
    );
    let notifier = Notifier::new(client, config.telegram.clone());
    let mut history = AlertHistory::load(&config.history_path);

    tracing::info!(path = %history.path().display(), "alert history loaded");

    let evaluator = SymbolEvaluator::new(store, notifier, config.clone());
    scheduler::run(&config, &evaluator, &mut history).await;

    Ok(())
}
