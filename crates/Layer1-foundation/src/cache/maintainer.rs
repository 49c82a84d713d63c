//! Maintenance sweeps: expiry purge and empty-branch compaction
//!
//! Both sweeps work from a snapshot taken under the read lock and then
//! re-validate each candidate under the write lock before removing it:
//!
//! - purge removes an entry only if it still carries the generation seen in
//!   the snapshot, so a fresh re-insert at the same coordinate survives
//! - compaction removes a key branch only if it is still empty
//!
//! Live traffic is never blocked for a whole sweep, only for one removal at
//! a time. Expiry is purge-driven: `check` returns entries regardless of age.

use std::time::Duration;
use tracing::{info, trace};

use super::manager::MemoCache;
use super::stats::Counters;
use crate::Result;

impl<V> MemoCache<V> {
    /// Evict entries older than `freshness_window`; returns how many went
    pub fn purge_expired(&self, freshness_window: Duration) -> Result<usize> {
        let now = self.inner.clock.now();
        let candidates: Vec<_> = self
            .read()?
            .snapshot()
            .into_iter()
            .filter(|(_, created_at, _)| now.saturating_duration_since(*created_at) > freshness_window)
            .collect();

        let mut evicted = 0;
        for (coord, _, generation) in candidates {
            if self.write()?.remove_if_generation(&coord, generation).is_some() {
                trace!(coordinate = %coord, "expired entry evicted");
                evicted += 1;
            } else {
                trace!(coordinate = %coord, "entry changed since snapshot, kept");
            }
        }

        Counters::add(&self.inner.counters.evictions, evicted);
        if evicted > 0 {
            info!(evicted, window_secs = freshness_window.as_secs(), "cache purge complete");
        }
        Ok(evicted)
    }

    /// Purge with the configured freshness window
    pub fn purge_expired_default(&self) -> Result<usize> {
        self.purge_expired(self.freshness_window())
    }

    /// Drop key branches that hold no operations; namespaces are kept
    pub fn compact_empty(&self) -> Result<usize> {
        let candidates = self.read()?.empty_keys();

        let mut compacted = 0;
        for (namespace, key) in candidates {
            if self.write()?.remove_key_if_empty(&namespace, &key) {
                trace!(namespace = %namespace, key = %key, "empty key branch removed");
                compacted += 1;
            }
        }

        Counters::add(&self.inner.counters.compactions, compacted);
        if compacted > 0 {
            info!(compacted, "cache compaction complete");
        }
        Ok(compacted)
    }
}
