//! Background maintenance task
//!
//! Runs `purge_expired` followed by `compact_empty` once per interval on the
//! tokio runtime. The first sweep happens one full interval after spawn.

use serde::Serialize;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::manager::MemoCache;
use crate::{Error, Result};

/// What a maintenance task did over its lifetime
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MaintenanceReport {
    pub ticks: u64,
    pub evicted: usize,
    pub compacted: usize,
    /// Set when a fatal store error ended the task early
    pub stopped_on: Option<String>,
}

/// Handle to a running maintenance task
///
/// Dropping the handle also stops the task, after its current sweep.
#[derive(Debug)]
pub struct MaintenanceHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<MaintenanceReport>,
}

impl MaintenanceHandle {
    /// Whether the task has already exited (for instance after a fatal error)
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the task and wait for its report
    pub async fn shutdown(mut self) -> Result<MaintenanceReport> {
        if let Some(tx) = self.shutdown.take() {
            // Receiver is gone if the task already stopped on its own
            let _ = tx.send(());
        }
        self.task
            .await
            .map_err(|e| Error::Task(format!("cache maintenance task: {}", e)))
    }
}

/// Spawn the periodic sweeper for `cache`
///
/// Must be called from within a tokio runtime.
pub fn spawn_maintenance<V>(
    cache: MemoCache<V>,
    interval: Duration,
    freshness_window: Duration,
) -> Result<MaintenanceHandle>
where
    V: Send + Sync + 'static,
{
    if interval.is_zero() {
        return Err(Error::InvalidInput(
            "maintenance interval must be greater than zero".to_string(),
        ));
    }

    let (tx, rx) = oneshot::channel();
    let task = tokio::spawn(run(cache, interval, freshness_window, rx));
    info!(
        interval_ms = interval.as_millis() as u64,
        window_secs = freshness_window.as_secs(),
        "cache maintenance started"
    );

    Ok(MaintenanceHandle {
        shutdown: Some(tx),
        task,
    })
}

async fn run<V>(
    cache: MemoCache<V>,
    interval: Duration,
    freshness_window: Duration,
    mut shutdown: oneshot::Receiver<()>,
) -> MaintenanceReport {
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut report = MaintenanceReport::default();

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                report.ticks += 1;
                match sweep(&cache, freshness_window) {
                    Ok((evicted, compacted)) => {
                        report.evicted += evicted;
                        report.compacted += compacted;
                        debug!(tick = report.ticks, evicted, compacted, "maintenance tick");
                    }
                    Err(e) if e.is_fatal() => {
                        error!(error = %e, "cache maintenance stopped");
                        report.stopped_on = Some(e.to_string());
                        break;
                    }
                    Err(e) => warn!(error = %e, "cache maintenance sweep failed"),
                }
            }
        }
    }

    info!(
        ticks = report.ticks,
        evicted = report.evicted,
        compacted = report.compacted,
        "cache maintenance finished"
    );
    report
}

fn sweep<V>(cache: &MemoCache<V>, freshness_window: Duration) -> Result<(usize, usize)> {
    let evicted = cache.purge_expired(freshness_window)?;
    let compacted = cache.compact_empty()?;
    Ok((evicted, compacted))
}

#[cfg(test)]
mod tests {
    use super::super::clock::ManualClock;
    use super::*;
    use crate::config::CacheConfig;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_zero_interval_rejected() {
        let cache: MemoCache = MemoCache::new(CacheConfig::default());
        let err = spawn_maintenance(cache, Duration::ZERO, Duration::from_secs(60)).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_shutdown_before_first_tick() {
        let cache: MemoCache = MemoCache::new(CacheConfig::default());
        let handle =
            spawn_maintenance(cache, Duration::from_secs(3600), Duration::from_secs(60)).unwrap();
        let report = handle.shutdown().await.unwrap();
        assert_eq!(report, MaintenanceReport::default());
    }

    #[tokio::test]
    async fn test_sweeps_expired_entries() {
        let clock = Arc::new(ManualClock::new());
        let cache: MemoCache = MemoCache::with_clock(CacheConfig::default(), clock.clone());
        cache.insert("iex", "MSFT", "quote", json!(1)).unwrap();
        cache.insert("iex", "MSFT", "news", json!(2)).unwrap();
        clock.advance(Duration::from_secs(120));

        let handle = spawn_maintenance(
            cache.clone(),
            Duration::from_millis(10),
            Duration::from_secs(60),
        )
        .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        let report = handle.shutdown().await.unwrap();

        assert!(report.ticks >= 1);
        assert_eq!(report.evicted, 2);
        assert_eq!(report.compacted, 1);
        assert!(report.stopped_on.is_none());
        assert!(cache.is_empty().unwrap());
        assert!(!cache.has_key("iex", "MSFT").unwrap());
    }

    #[tokio::test]
    async fn test_stops_on_poisoned_store() {
        let cache: MemoCache = MemoCache::new(CacheConfig::default());
        let poisoner = cache.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.inner.store.write().unwrap();
            panic!("writer died mid-update");
        })
        .join();

        let handle =
            spawn_maintenance(cache, Duration::from_millis(5), Duration::from_secs(60)).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished());

        let report = handle.shutdown().await.unwrap();
        assert_eq!(report.ticks, 1);
        assert!(report.stopped_on.unwrap().contains("unavailable"));
    }
}
