//! Cache statistics and structural summary

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters, updated without taking the store lock
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub bypasses: AtomicU64,
    pub inserts: AtomicU64,
    pub capacity_skips: AtomicU64,
    pub evictions: AtomicU64,
    pub compactions: AtomicU64,
}

impl Counters {
    #[inline]
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add(counter: &AtomicU64, n: usize) {
        counter.fetch_add(n as u64, Ordering::Relaxed);
    }

    fn load(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}

/// Point-in-time statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Memoized calls answered from the store
    pub hits: u64,
    /// Memoized calls that ran the wrapped operation
    pub misses: u64,
    /// Calls whose arguments produced no key
    pub bypasses: u64,
    pub inserts: u64,
    /// Inserts skipped because the size guard refused
    pub capacity_skips: u64,
    /// Entries removed by purge sweeps
    pub evictions: u64,
    /// Key branches removed by compaction
    pub compactions: u64,
    pub entries: usize,
    /// Approximate footprint, see [`SizeEstimate`](super::SizeEstimate)
    pub approx_bytes: usize,
    pub capacity_bytes: usize,
}

impl CacheStats {
    pub(crate) fn from_counters(
        counters: &Counters,
        entries: usize,
        approx_bytes: usize,
        capacity_bytes: usize,
    ) -> Self {
        Self {
            hits: Counters::load(&counters.hits),
            misses: Counters::load(&counters.misses),
            bypasses: Counters::load(&counters.bypasses),
            inserts: Counters::load(&counters.inserts),
            capacity_skips: Counters::load(&counters.capacity_skips),
            evictions: Counters::load(&counters.evictions),
            compactions: Counters::load(&counters.compactions),
            entries,
            approx_bytes,
            capacity_bytes,
        }
    }

    /// Hits over memoized lookups (bypasses excluded)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// What the store holds: namespace → key → operation names
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheSummary {
    pub namespaces: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    pub entries: usize,
    pub approx_bytes: usize,
}

impl CacheSummary {
    /// Operation names cached for a key, if the key branch exists
    pub fn operations(&self, namespace: &str, key: &str) -> Option<&[String]> {
        self.namespaces
            .get(namespace)?
            .get(key)
            .map(|ops| ops.as_slice())
    }
}
