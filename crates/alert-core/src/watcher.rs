//! Exactly-once arrival detection over collection snapshots

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde_json::Value;

/// A record that appeared in the latest snapshot and not the one before
#[derive(Debug, Clone)]
pub struct Arrival {
    /// Collection key of the new record
    pub key: String,
    /// The record value as observed in the arriving snapshot
    pub record: Value,
}

impl Arrival {
    /// Best-effort creation timestamp for newest-selection
    fn timestamp(&self) -> Option<DateTime<Utc>> {
        for field in ["dateTime", "createdAt", "timestamp"] {
            if let Some(raw) = self.record.get(field).and_then(Value::as_str) {
                if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
                    return Some(parsed.with_timezone(&Utc));
                }
            }
        }
        None
    }
}

/// Diffs successive full snapshots of a keyed collection
///
/// The key set is private to the watcher and is replaced wholesale inside
/// [`ArrivalWatcher::observe`], before the method returns. Callers that do
/// asynchronous follow-up work (enrichment, lookups) therefore cannot race a
/// second notification into re-detecting the same key, as long as the same
/// task feeds the watcher — which is how [`crate::AlertMonitor`] drives it.
/// A multi-threaded caller must serialize `observe` calls itself.
///
/// Independent watcher instances over the same collection share nothing.
#[derive(Debug, Default)]
pub struct ArrivalWatcher {
    /// `None` until the bootstrap snapshot has been observed
    known: Option<HashSet<String>>,
}

impl ArrivalWatcher {
    /// Create a watcher awaiting its bootstrap snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in the next snapshot and return the arrivals it contains
    ///
    /// The first call records the key set and emits nothing. Deletions are
    /// not arrivals; a missing or empty snapshot resets the key set with no
    /// emission. Arrivals are returned in ascending key order.
    pub fn observe(&mut self, snapshot: Option<&Value>) -> Vec<Arrival> {
        let entries = snapshot.and_then(Value::as_object);
        let current: HashSet<String> = entries
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default();

        let previous = self.known.replace(current);
        let Some(previous) = previous else {
            // Bootstrap: seed only.
            return Vec::new();
        };

        let Some(entries) = entries else {
            return Vec::new();
        };

        let mut arrivals: Vec<Arrival> = entries
            .iter()
            .filter(|(key, _)| !previous.contains(*key))
            .map(|(key, record)| Arrival {
                key: key.clone(),
                record: record.clone(),
            })
            .collect();
        arrivals.sort_by(|a, b| a.key.cmp(&b.key));
        arrivals
    }

    /// Whether the bootstrap snapshot has been observed
    pub fn is_bootstrapped(&self) -> bool {
        self.known.is_some()
    }

    /// Pick the newest arrival of a batch for single-target consumers
    ///
    /// Highest parseable timestamp wins; ties (and records without one) fall
    /// back to the greatest key, so the choice is deterministic.
    pub fn newest_of(arrivals: &[Arrival]) -> Option<&Arrival> {
        arrivals
            .iter()
            .max_by(|a, b| match (a.timestamp(), b.timestamp()) {
                (Some(ta), Some(tb)) => ta.cmp(&tb).then_with(|| a.key.cmp(&b.key)),
                (Some(_), None) => std::cmp::Ordering::Greater,
                (None, Some(_)) => std::cmp::Ordering::Less,
                (None, None) => a.key.cmp(&b.key),
            })
    }
}
