//! Background maintainer running alongside memoized traffic

use quotecache_foundation::{keys, spawn_maintenance, CacheConfig, Error, MemoCache};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_maintainer_bounds_staleness() {
    let cache: MemoCache = MemoCache::new(CacheConfig::default());
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let quote = cache.wrap_async(
        "iex",
        "quote",
        |symbol: &String| Some(symbol.clone()),
        move |symbol: String| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<Value, Error>(json!({"symbol": symbol}))
            }
        },
    );

    let handle = spawn_maintenance(
        cache.clone(),
        Duration::from_millis(20),
        Duration::from_millis(50),
    )
    .unwrap();

    quote.call("MSFT".to_string()).await.unwrap();
    quote.call("MSFT".to_string()).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Well past window + interval: the entry must have been swept
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(cache.check("iex", "MSFT", "quote").unwrap().is_none());
    assert!(!cache.has_key("iex", "MSFT").unwrap());

    quote.call("MSFT".to_string()).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let report = handle.shutdown().await.unwrap();
    assert!(report.ticks >= 2);
    assert!(report.evicted >= 1);
    assert!(report.compacted >= 1);
    assert!(report.stopped_on.is_none());
    assert_eq!(cache.namespaces().unwrap(), vec!["iex", "sigma7"]);
}

#[tokio::test]
async fn test_fixed_key_dataset_refreshes_after_sweep() {
    let cache: MemoCache = MemoCache::new(CacheConfig::default());
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let trades = cache.wrap(
        "sigma7",
        "political_trades",
        keys::fixed("misc"),
        move |_: ()| -> Result<Value, Error> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(json!({"transactions": []}))
        },
    );

    trades.call(()).unwrap();
    trades.call(()).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(cache.purge_expired(Duration::from_millis(10)).unwrap(), 1);
    assert_eq!(cache.compact_empty().unwrap(), 1);

    trades.call(()).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
