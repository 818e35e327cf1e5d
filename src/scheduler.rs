//! # scheduler — Fixed-Period Scan Loop
//!
//! Drives the evaluator over the whole symbol universe on a fixed period.
//! `MissedTickBehavior::Skip` guarantees a long-running scan is never
//! overlapped by the next one — late deadlines are simply dropped. One
//! symbol's failure never aborts the scan for the rest.

use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use crate::alerts::AlertHistory;
use crate::config::Config;
use crate::evaluator::SymbolEvaluator;

/// Run scan cycles forever. Only returns if the process is torn down.
pub async fn run(config: &Config, evaluator: &SymbolEvaluator, history: &mut AlertHistory) {
    let mut ticker = interval(config.scan_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        info!(symbols = config.symbols.len(), "🔍 scan cycle starting");
        let started = std::time::Instant::now();

        for symbol in &config.symbols {
            if let Err(e) = evaluator.evaluate(symbol, history).await {
                error!(symbol = %symbol, error = %e, "symbol evaluation failed — skipped this cycle");
            }
        }

        info!(elapsed_ms = started.elapsed().as_millis() as u64, "scan cycle finished");
    }
}
