//! # alerts — Cooldown Gate & Persisted History
//!
//! Decides whether a qualifying score may actually reach the outbound
//! channel. Per (symbol, direction) the gate permits an emission when:
//!
//! 1. no alert was ever recorded, OR
//! 2. the cooldown window since the last emission has elapsed, OR
//! 3. the setup fingerprint differs from the recorded one — a materially
//!    different entry/SL/TP is allowed to re-alert inside the cooldown.
//!
//! The history is flushed to disk synchronously after every mutation. A
//! failed write is logged and the emission stands: re-sending a duplicate
//! alert is worse than a missed history write.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::WatchError;
use crate::risk::TradeLevels;
use crate::scoring::Direction;

// ─── Fingerprint ──────────────────────────────────────────────────────────────

/// FNV-1a over the canonical 6-decimal rendering of entry/SL/TP. Deliberately
/// not `DefaultHasher`: the value is persisted and must stay stable across
/// process restarts and compiler upgrades.
pub fn fingerprint(levels: &TradeLevels) -> u64 {
    let canon = format!(
        "{:.6}|{:.6}|{:.6}",
        levels.entry, levels.stop_loss, levels.take_profit
    );
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;
    canon.bytes().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

// ─── Records ──────────────────────────────────────────────────────────────────

/// Last emitted alert for one (symbol, direction).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub timestamp: DateTime<Utc>,
    pub fingerprint: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolAlerts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buy: Option<AlertRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sell: Option<AlertRecord>,
}

impl SymbolAlerts {
    fn get(&self, direction: Direction) -> Option<&AlertRecord> {
        match direction {
            Direction::Buy => self.buy.as_ref(),
            Direction::Sell => self.sell.as_ref(),
        }
    }

    fn set(&mut self, direction: Direction, record: AlertRecord) {
        match direction {
            Direction::Buy => self.buy = Some(record),
            Direction::Sell => self.sell = Some(record),
        }
    }
}

// ─── History ──────────────────────────────────────────────────────────────────

/// Durable map of last-alert records, overwritten wholesale on each mutation.
#[derive(Debug)]
pub struct AlertHistory {
    path: PathBuf,
    entries: HashMap<String, SymbolAlerts>,
}

impl AlertHistory {
    /// Load from disk. A missing or corrupt file starts an empty history —
    /// never a fatal condition.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %path.display(), error = %e,
                        "alert history corrupt — starting empty");
                    HashMap::new()
                }
            },
            Err(_) => {
                debug!(path = %path.display(), "no alert history file — starting empty");
                HashMap::new()
            }
        };
        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record_for(&self, symbol: &str, direction: Direction) -> Option<&AlertRecord> {
        self.entries.get(symbol).and_then(|s| s.get(direction))
    }

    /// Store the record and flush the whole document to disk. The in-memory
    /// update always happens; only the flush can fail.
    pub fn record(
        &mut self,
        symbol: &str,
        direction: Direction,
        record: AlertRecord,
    ) -> Result<(), WatchError> {
        self.entries
            .entry(symbol.to_string())
            .or_default()
            .set(direction, record);
        self.save()
    }

    fn save(&self) -> Result<(), WatchError> {
        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

// ─── Gate ─────────────────────────────────────────────────────────────────────

/// Outcome of the gate check, with the reason for the log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Permit { reason: &'static str },
    Deny { reason: &'static str },
}

/// Pure decision: prior record (if any) vs `now`, the cooldown window and the
/// freshly computed fingerprint.
pub fn evaluate_gate(
    prior: Option<&AlertRecord>,
    now: DateTime<Utc>,
    cooldown: Duration,
    new_fingerprint: u64,
) -> GateDecision {
    let Some(record) = prior else {
        return GateDecision::Permit {
            reason: "first alert for this symbol/direction",
        };
    };

    if now.signed_duration_since(record.timestamp) >= cooldown {
        return GateDecision::Permit {
            reason: "cooldown elapsed",
        };
    }

    if record.fingerprint != new_fingerprint {
        return GateDecision::Permit {
            reason: "materially new setup inside cooldown",
        };
    }

    GateDecision::Deny {
        reason: "cooldown active, setup unchanged",
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn make_levels() -> TradeLevels {
        TradeLevels {
            entry: 30000.123456,
            stop_loss: 29850.123456,
            take_profit: 30225.123456,
        }
    }

    fn make_record(minutes_ago: i64, fingerprint: u64) -> AlertRecord {
        AlertRecord {
            timestamp: Utc::now() - Duration::minutes(minutes_ago),
            fingerprint,
        }
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        assert_eq!(fingerprint(&make_levels()), fingerprint(&make_levels()));
    }

    #[test]
    fn test_fingerprint_sensitive_at_sixth_decimal() {
        let mut other = make_levels();
        other.take_profit += 0.000001;
        assert_ne!(fingerprint(&make_levels()), fingerprint(&other));
    }

    #[test]
    fn test_gate_permits_first_alert() {
        let decision = evaluate_gate(None, Utc::now(), Duration::minutes(30), 42);
        assert!(matches!(decision, GateDecision::Permit { .. }));
    }

    #[test]
    fn test_gate_denies_inside_cooldown() {
        // Fired 5 minutes ago, 30-minute window, fingerprint unchanged.
        let record = make_record(5, 42);
        let decision = evaluate_gate(Some(&record), Utc::now(), Duration::minutes(30), 42);
        assert_eq!(
            decision,
            GateDecision::Deny {
                reason: "cooldown active, setup unchanged"
            }
        );
    }

    #[test]
    fn test_gate_permits_after_cooldown() {
        let record = make_record(31, 42);
        let decision = evaluate_gate(Some(&record), Utc::now(), Duration::minutes(30), 42);
        assert!(matches!(decision, GateDecision::Permit { .. }));
    }

    #[test]
    fn test_gate_permits_new_fingerprint_inside_cooldown() {
        let record = make_record(5, 42);
        let decision = evaluate_gate(Some(&record), Utc::now(), Duration::minutes(30), 43);
        assert!(matches!(decision, GateDecision::Permit { .. }));
    }

    #[test]
    fn test_history_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alert_history.json");

        let record = AlertRecord {
            timestamp: "2026-08-28T12:34:56.789Z".parse().unwrap(),
            fingerprint: fingerprint(&make_levels()),
        };

        let mut history = AlertHistory::load(&path);
        history.record("BTCUSDT", Direction::Buy, record).unwrap();
        history
            .record("ETHUSDT", Direction::Sell, make_record(0, 7))
            .unwrap();

        let reloaded = AlertHistory::load(&path);
        assert_eq!(
            reloaded.record_for("BTCUSDT", Direction::Buy),
            Some(&record)
        );
        assert_eq!(reloaded.record_for("BTCUSDT", Direction::Sell), None);
        assert!(reloaded.record_for("ETHUSDT", Direction::Sell).is_some());
    }

    #[test]
    fn test_corrupt_history_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alert_history.json");
        std::fs::write(&path, "{not json").unwrap();

        let history = AlertHistory::load(&path);
        assert_eq!(history.record_for("BTCUSDT", Direction::Buy), None);
    }
}
