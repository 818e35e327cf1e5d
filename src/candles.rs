//! # candles — TTL Candle Cache
//!
//! Single source of candle data for the rest of the engine. Series are cached
//! per (symbol, interval, limit) and served unchanged until the TTL expires,
//! then refetched and replaced wholesale — never mutated in place.
//!
//! Concurrent `get`s for the same key must not each hit the exchange: the
//! second caller parks on a per-key mutex and re-checks the cache once the
//! first fetch has landed. That is a correctness requirement (bounded call
//! volume, no partial updates), not an optimization.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::error::WatchError;
use crate::market::{BinanceClient, Candle, Interval};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    symbol: String,
    interval: Interval,
    limit: u32,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    series: Arc<Vec<Candle>>,
    fetched_at: Instant,
}

pub struct CandleStore {
    client: BinanceClient,
    ttl: Duration,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    /// Per-key fetch gates for in-flight de-duplication.
    inflight: Mutex<HashMap<CacheKey, Arc<Mutex<()>>>>,
}

impl CandleStore {
    pub fn new(client: BinanceClient, ttl: Duration) -> Self {
        Self {
            client,
            ttl,
            entries: RwLock::new(HashMap::new()),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached series while fresh; otherwise fetch and replace the
    /// entry. An empty or malformed exchange response is `DataUnavailable`.
    pub async fn get(
        &self,
        symbol: &str,
        interval: Interval,
        limit: u32,
    ) -> Result<Arc<Vec<Candle>>, WatchError> {
        let key = CacheKey {
            symbol: symbol.to_string(),
            interval,
            limit,
        };

        if let Some(series) = self.lookup(&key).await {
            return Ok(series);
        }

        // Take the per-key gate so only one fetch per key is in flight.
        let gate = {
            let mut inflight = self.inflight.lock().await;
            inflight.entry(key.clone()).or_default().clone()
        };
        let _fetching = gate.lock().await;

        // A sibling may have refilled the entry while we waited.
        if let Some(series) = self.lookup(&key).await {
            return Ok(series);
        }

        debug!(symbol, interval = %interval, limit, "cache miss — fetching klines");
        let candles = self.client.fetch_klines(symbol, interval, limit).await?;
        debug!(
            symbol,
            interval = %interval,
            count = candles.len(),
            latest_close_time = candles.last().map(|c| c.close_time),
            "series refreshed"
        );
        let series = Arc::new(candles);

        self.entries.write().await.insert(
            key,
            CacheEntry {
                series: Arc::clone(&series),
                fetched_at: Instant::now(),
            },
        );

        Ok(series)
    }

    async fn lookup(&self, key: &CacheKey) -> Option<Arc<Vec<Candle>>> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if entry.fetched_at.elapsed() < self.ttl {
            Some(Arc::clone(&entry.series))
        } else {
            None
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
