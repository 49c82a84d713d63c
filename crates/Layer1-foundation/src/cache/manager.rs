//! Memo cache handle: construction and the accessor operations
//!
//! A [`MemoCache`] is built once at startup and cloned into every consumer.
//! All clones share one store.

use serde_json::Value;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tracing::{debug, warn};

use super::clock::{Clock, SystemClock};
use super::entry::{CacheEntry, Coordinate};
use super::size::{SizeEstimate, SizeGuard};
use super::stats::{CacheStats, CacheSummary, Counters};
use super::store::Store;
use crate::config::CacheConfig;
use crate::{Error, Result};

/// Shared, process-local memoization cache
///
/// # Usage
///
/// ```rust,ignore
/// let cache: MemoCache = MemoCache::new(CacheConfig::from_env()?);
///
/// cache.insert("iex", "MSFT", "quote", json!({"price": 100}))?;
/// if let Some(entry) = cache.check("iex", "MSFT", "quote")? {
///     println!("{}", entry.payload());
/// }
/// cache.delete("iex", "MSFT", "quote")?;
/// ```
#[derive(Debug)]
pub struct MemoCache<V = Value> {
    pub(super) inner: Arc<Inner<V>>,
}

#[derive(Debug)]
pub(super) struct Inner<V> {
    pub(super) store: RwLock<Store<V>>,
    pub(super) guard: SizeGuard,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) counters: Counters,
    pub(super) config: CacheConfig,
}

impl<V> Clone for MemoCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> MemoCache<V> {
    /// Create a cache using the system clock
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a cache with an explicit time source
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let store = Store::new(config.namespaces.iter().cloned());
        Self {
            inner: Arc::new(Inner {
                store: RwLock::new(store),
                guard: SizeGuard::new(config.capacity_bytes),
                clock,
                counters: Counters::default(),
                config,
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Configured default freshness window
    pub fn freshness_window(&self) -> Duration {
        self.inner.config.freshness_window()
    }

    pub(super) fn read(&self) -> Result<RwLockReadGuard<'_, Store<V>>> {
        self.inner.store.read().map_err(|_| poisoned())
    }

    pub(super) fn write(&self) -> Result<RwLockWriteGuard<'_, Store<V>>> {
        self.inner.store.write().map_err(|_| poisoned())
    }

    // ========================================================================
    // Accessor
    // ========================================================================

    /// Remove the entry at a coordinate; `NotFound` if there is none
    pub fn delete(&self, namespace: &str, key: &str, operation: &str) -> Result<()> {
        self.delete_at(&Coordinate::new(namespace, key, operation))
    }

    pub fn delete_at(&self, coord: &Coordinate) -> Result<()> {
        match self.write()?.remove(coord) {
            Some(_) => {
                debug!(coordinate = %coord, "cache entry deleted");
                Ok(())
            }
            None => Err(Error::not_found(coord)),
        }
    }

    /// Remove every operation cached under a key; returns how many went
    pub fn invalidate_key(&self, namespace: &str, key: &str) -> Result<usize> {
        let removed = self.write()?.clear_key(namespace, key);
        if removed > 0 {
            debug!(namespace, key, removed, "cache key invalidated");
        }
        Ok(removed)
    }

    // ========================================================================
    // Size Guard
    // ========================================================================

    /// Whether the approximate footprint is below the configured capacity
    pub fn within_capacity(&self) -> Result<bool> {
        let footprint = self.read()?.footprint_bytes();
        Ok(self.inner.guard.within_capacity(footprint))
    }

    /// Approximate footprint in bytes
    pub fn approx_bytes(&self) -> Result<usize> {
        Ok(self.read()?.footprint_bytes())
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Whether a key branch exists (even an empty one)
    pub fn has_key(&self, namespace: &str, key: &str) -> Result<bool> {
        Ok(self.read()?.has_key(namespace, key))
    }

    /// Namespace names, sorted
    pub fn namespaces(&self) -> Result<Vec<String>> {
        let store = self.read()?;
        let mut names: Vec<String> = store.namespaces().map(|(ns, _)| ns.clone()).collect();
        names.sort();
        Ok(names)
    }

    pub fn stats(&self) -> Result<CacheStats> {
        let store = self.read()?;
        Ok(CacheStats::from_counters(
            &self.inner.counters,
            store.len(),
            store.footprint_bytes(),
            self.inner.guard.capacity_bytes(),
        ))
    }

    /// Structural report of what is cached
    pub fn summary(&self) -> Result<CacheSummary> {
        let store = self.read()?;
        let mut summary = CacheSummary {
            entries: store.len(),
            approx_bytes: store.footprint_bytes(),
            ..Default::default()
        };
        for (namespace, keys) in store.namespaces() {
            let entry = summary.namespaces.entry(namespace.clone()).or_default();
            for (key, ops) in keys {
                let mut names: Vec<String> = ops.keys().cloned().collect();
                names.sort();
                entry.insert(key.clone(), names);
            }
        }
        Ok(summary)
    }
}

impl<V: Clone> MemoCache<V> {
    /// Look up a coordinate without touching the store
    pub fn check(&self, namespace: &str, key: &str, operation: &str) -> Result<Option<CacheEntry<V>>> {
        self.check_at(&Coordinate::new(namespace, key, operation))
    }

    pub fn check_at(&self, coord: &Coordinate) -> Result<Option<CacheEntry<V>>> {
        Ok(self.read()?.get(coord).cloned())
    }
}

impl<V: SizeEstimate> MemoCache<V> {
    /// Stamp `payload` with the current time and store it, replacing any entry
    pub fn insert(&self, namespace: &str, key: &str, operation: &str, payload: V) -> Result<()> {
        self.insert_at(&Coordinate::new(namespace, key, operation), payload)
    }

    pub fn insert_at(&self, coord: &Coordinate, payload: V) -> Result<()> {
        let size_bytes = payload.estimated_size();
        let now = self.inner.clock.now();
        let replaced = self.write()?.insert(coord, payload, now, size_bytes);
        Counters::bump(&self.inner.counters.inserts);
        debug!(
            coordinate = %coord,
            size_bytes,
            replaced = replaced.is_some(),
            "cache entry stored"
        );
        Ok(())
    }
}

fn poisoned() -> Error {
    warn!("cache store lock poisoned; refusing to serve possibly corrupted data");
    Error::StoreUnavailable("store lock poisoned by a panicked writer".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cache() -> MemoCache {
        MemoCache::new(CacheConfig::default())
    }

    #[test]
    fn test_check_insert_delete() {
        let cache = cache();
        assert!(cache.check("iex", "MSFT", "quote").unwrap().is_none());

        cache
            .insert("iex", "MSFT", "quote", json!({"price": 100}))
            .unwrap();
        let entry = cache.check("iex", "MSFT", "quote").unwrap().unwrap();
        assert_eq!(entry.payload(), &json!({"price": 100}));

        cache.delete("iex", "MSFT", "quote").unwrap();
        assert!(cache.check("iex", "MSFT", "quote").unwrap().is_none());
    }

    #[test]
    fn test_delete_missing_is_not_found() {
        let cache = cache();
        let err = cache.delete("iex", "MSFT", "quote").unwrap_err();
        assert!(err.is_not_found());

        // missing namespace branch
        let err = cache.delete("nowhere", "MSFT", "quote").unwrap_err();
        assert!(err.is_not_found());

        // present key, missing operation
        cache.insert("iex", "MSFT", "news", json!([])).unwrap();
        assert!(cache.delete("iex", "MSFT", "quote").unwrap_err().is_not_found());
    }

    #[test]
    fn test_reinsert_replaces_payload_and_stamp() {
        let cache = cache();
        cache.insert("iex", "MSFT", "quote", json!({"price": 100})).unwrap();
        let first = cache.check("iex", "MSFT", "quote").unwrap().unwrap();

        cache.insert("iex", "MSFT", "quote", json!({"price": 101})).unwrap();
        let second = cache.check("iex", "MSFT", "quote").unwrap().unwrap();

        assert_eq!(second.payload(), &json!({"price": 101}));
        assert!(second.generation() > first.generation());
        assert!(second.created_at() >= first.created_at());
        assert_eq!(cache.len().unwrap(), 1);
    }

    #[test]
    fn test_check_does_not_mutate() {
        let cache = cache();
        cache.insert("iex", "MSFT", "quote", json!(1)).unwrap();
        let before = cache.summary().unwrap();
        let _ = cache.check("iex", "MSFT", "quote").unwrap();
        let _ = cache.check("iex", "GOOG", "quote").unwrap();
        assert_eq!(cache.summary().unwrap(), before);
    }

    #[test]
    fn test_clones_share_store() {
        let a = cache();
        let b = a.clone();
        a.insert("sigma7", "misc", "political_trades", json!({"transactions": []}))
            .unwrap();
        assert!(b.check("sigma7", "misc", "political_trades").unwrap().is_some());
    }

    #[test]
    fn test_within_capacity_tracks_footprint() {
        let cache: MemoCache = MemoCache::new(CacheConfig::default().with_capacity_bytes(300));
        assert!(cache.within_capacity().unwrap());

        cache
            .insert("iex", "MSFT", "chart", json!({"series": "x".repeat(400)}))
            .unwrap();
        assert!(!cache.within_capacity().unwrap());

        cache.delete("iex", "MSFT", "chart").unwrap();
        assert!(cache.within_capacity().unwrap());
    }

    #[test]
    fn test_invalidate_key() {
        let cache = cache();
        cache.insert("iex", "MSFT", "quote", json!(1)).unwrap();
        cache.insert("iex", "MSFT", "news", json!(2)).unwrap();
        cache.insert("iex", "AAPL", "quote", json!(3)).unwrap();

        assert_eq!(cache.invalidate_key("iex", "MSFT").unwrap(), 2);
        assert!(cache.check("iex", "MSFT", "news").unwrap().is_none());
        assert!(cache.check("iex", "AAPL", "quote").unwrap().is_some());
        assert_eq!(cache.invalidate_key("iex", "TSLA").unwrap(), 0);
    }

    #[test]
    fn test_summary_and_namespaces() {
        let cache = cache();
        cache.insert("iex", "MSFT", "quote", json!(1)).unwrap();
        cache.insert("iex", "MSFT", "news", json!(2)).unwrap();
        cache.insert("fred", "GDP", "series", json!(3)).unwrap();

        let summary = cache.summary().unwrap();
        assert_eq!(summary.entries, 3);
        assert_eq!(
            summary.operations("iex", "MSFT").unwrap(),
            &["news".to_string(), "quote".to_string()]
        );
        assert!(summary.namespaces["sigma7"].is_empty());
        assert_eq!(cache.namespaces().unwrap(), vec!["fred", "iex", "sigma7"]);
    }

    #[test]
    fn test_poisoned_store_is_unavailable() {
        let cache = cache();
        let poisoner = cache.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.inner.store.write().unwrap();
            panic!("writer died mid-update");
        })
        .join();

        let err = cache.check("iex", "MSFT", "quote").unwrap_err();
        assert!(err.is_fatal());
        assert!(cache.insert("iex", "MSFT", "quote", json!(1)).unwrap_err().is_fatal());
    }
}
