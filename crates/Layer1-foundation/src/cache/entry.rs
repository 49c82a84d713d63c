//! Coordinates and cached entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// Address of a cache slot: `(namespace, key, operation)`
///
/// - `namespace`: origin of the data (an upstream provider, or derived analytics)
/// - `key`: the subject, usually a ticker symbol
/// - `operation`: the read operation that produced the payload
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coordinate {
    pub namespace: String,
    pub key: String,
    pub operation: String,
}

impl Coordinate {
    pub fn new(
        namespace: impl Into<String>,
        key: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            key: key.into(),
            operation: operation.into(),
        }
    }

    /// Bytes taken by the three coordinate strings
    pub(crate) fn text_len(&self) -> usize {
        self.namespace.len() + self.key.len() + self.operation.len()
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.namespace, self.key, self.operation)
    }
}

/// A cached payload plus its insertion stamp
///
/// Entries are immutable once stored. Re-inserting at the same coordinate
/// swaps in a whole new entry.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    payload: V,
    created_at: Instant,
    cached_at: DateTime<Utc>,
    generation: u64,
    size_bytes: usize,
}

impl<V> CacheEntry<V> {
    pub(crate) fn new(payload: V, created_at: Instant, generation: u64, size_bytes: usize) -> Self {
        Self {
            payload,
            created_at,
            cached_at: Utc::now(),
            generation,
            size_bytes,
        }
    }

    pub fn payload(&self) -> &V {
        &self.payload
    }

    pub fn into_payload(self) -> V {
        self.payload
    }

    /// Monotonic insertion instant (used for expiry)
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Wall-clock insertion time (reporting only)
    pub fn cached_at(&self) -> DateTime<Utc> {
        self.cached_at
    }

    /// Store-wide insertion sequence number
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Estimated payload size in bytes
    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    /// Age relative to `now`; zero if `now` is earlier than the stamp
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }

    /// Whether the entry is older than the freshness window
    pub fn is_expired(&self, now: Instant, window: Duration) -> bool {
        self.age(now) > window
    }
}
