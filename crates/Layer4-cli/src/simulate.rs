//! Simulated upstream run
//!
//! Wraps a fake quote provider (per symbol) and a fake market-wide dataset
//! (fixed key) with the memoizer, runs lookup rounds while the background
//! maintainer sweeps, and reports what happened.

use futures::future::join_all;
use quotecache_foundation::{
    keys, spawn_maintenance, CacheConfig, CacheStats, CacheSummary, MaintenanceReport, MemoCache,
};
use rand::Rng;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone)]
pub struct SimulateOptions {
    pub symbols: Vec<String>,
    pub rounds: usize,
    pub latency: Duration,
    pub pause: Duration,
    pub sweep_interval: Duration,
}

#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub rounds: usize,
    pub lookups: usize,
    pub upstream_calls: usize,
    pub hit_rate: f64,
    pub stats: CacheStats,
    pub maintenance: MaintenanceReport,
    pub summary: CacheSummary,
}

/// Stand-in for a slow, rate-limited data provider
#[derive(Debug)]
struct Upstream {
    latency: Duration,
    calls: AtomicUsize,
}

impl Upstream {
    fn new(latency: Duration) -> Self {
        Self {
            latency,
            calls: AtomicUsize::new(0),
        }
    }

    async fn quote(&self, symbol: String) -> anyhow::Result<Value> {
        tokio::time::sleep(self.latency).await;
        self.calls.fetch_add(1, Ordering::SeqCst);
        let price: f64 = rand::thread_rng().gen_range(50.0..500.0);
        Ok(json!({
            "symbol": symbol,
            "latestPrice": (price * 100.0).round() / 100.0,
        }))
    }

    async fn political_trades(&self) -> anyhow::Result<Value> {
        tokio::time::sleep(self.latency).await;
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({ "transactions": [] }))
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub async fn run(config: CacheConfig, options: SimulateOptions) -> anyhow::Result<SimulationReport> {
    let cache: MemoCache = MemoCache::new(config.clone());
    let upstream = Arc::new(Upstream::new(options.latency));

    let source = upstream.clone();
    let quote = cache.wrap_async(
        "iex",
        "quote",
        |symbol: &String| (!symbol.is_empty()).then(|| symbol.clone()),
        move |symbol: String| {
            let source = source.clone();
            async move { source.quote(symbol).await }
        },
    );

    let source = upstream.clone();
    let trades = cache.wrap_async(
        "sigma7",
        "political_trades",
        keys::fixed("misc"),
        move |_: ()| {
            let source = source.clone();
            async move { source.political_trades().await }
        },
    );

    let maintenance = spawn_maintenance(
        cache.clone(),
        options.sweep_interval,
        config.freshness_window(),
    )?;

    let mut lookups = 0;
    for round in 1..=options.rounds {
        let results = join_all(options.symbols.iter().map(|s| quote.call(s.clone()))).await;
        for result in results {
            result?;
        }
        trades.call(()).await?;
        lookups += options.symbols.len() + 1;

        info!(round, upstream_calls = upstream.calls(), "Round complete");
        if round < options.rounds {
            tokio::time::sleep(options.pause).await;
        }
    }

    let maintenance = maintenance.shutdown().await?;
    let stats = cache.stats()?;

    Ok(SimulationReport {
        rounds: options.rounds,
        lookups,
        upstream_calls: upstream.calls(),
        hit_rate: stats.hit_rate(),
        stats,
        maintenance,
        summary: cache.summary()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(rounds: usize) -> SimulateOptions {
        SimulateOptions {
            symbols: vec!["MSFT".into(), "AAPL".into()],
            rounds,
            latency: Duration::ZERO,
            pause: Duration::ZERO,
            sweep_interval: Duration::from_secs(3600),
        }
    }

    #[tokio::test]
    async fn test_repeat_rounds_hit_cache() {
        let report = run(CacheConfig::default(), options(4)).await.unwrap();

        assert_eq!(report.lookups, 12);
        // one call per symbol plus one for the market-wide dataset
        assert_eq!(report.upstream_calls, 3);
        assert_eq!(report.stats.hits, 9);
        assert_eq!(report.stats.misses, 3);
        assert_eq!(
            report.summary.operations("sigma7", "misc").unwrap(),
            &["political_trades".to_string()]
        );
    }

    #[tokio::test]
    async fn test_zero_capacity_always_calls_upstream() {
        let config = CacheConfig::default().with_capacity_bytes(0);
        let report = run(config, options(3)).await.unwrap();

        assert_eq!(report.upstream_calls, 9);
        assert_eq!(report.stats.capacity_skips, 9);
        assert_eq!(report.stats.entries, 0);
    }
}
