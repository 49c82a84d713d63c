//! # Memoization Cache
//!
//! Process-local, time-bounded cache for the results of expensive read
//! operations against slow upstream data providers.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Memoizer (wrap / wrap_async)                                │
//! │    key_fn(args) ─► check ─► hit: cached payload              │
//! │                      └────► miss: op(args) ─► size guard     │
//! │                                                ─► insert     │
//! ├──────────────────────────────────────────────────────────────┤
//! │  MemoCache (Arc, cloned into every consumer)                 │
//! │    RwLock<Store>:  namespace ─► key ─► operation ─► entry    │
//! │    Counters        SizeGuard        Clock                    │
//! ├──────────────────────────────────────────────────────────────┤
//! │  Maintenance (spawn_maintenance, every sweep interval)       │
//! │    purge_expired(window) ─► compact_empty()                  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use quotecache_foundation::cache::{keys, spawn_maintenance, MemoCache};
//! use quotecache_foundation::CacheConfig;
//!
//! let config = CacheConfig::from_env()?;
//! let cache: MemoCache = MemoCache::new(config.clone());
//!
//! let quote = cache.wrap("iex", "quote", |s: &String| Some(s.clone()), fetch_quote);
//! let msft = quote.call("MSFT".to_string())?;
//!
//! let maintenance =
//!     spawn_maintenance(cache.clone(), config.sweep_interval(), config.freshness_window())?;
//! // ...
//! maintenance.shutdown().await?;
//! ```
//!
//! Entries are removed by sweeps only: `check` answers with whatever is
//! stored, however old, until the next `purge_expired`.

mod clock;
mod entry;
mod maintainer;
mod manager;
pub mod memo;
mod scheduler;
mod size;
mod stats;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::{CacheEntry, Coordinate};
pub use manager::MemoCache;
pub use memo::{keys, AsyncMemoized, Memoized};
pub use scheduler::{spawn_maintenance, MaintenanceHandle, MaintenanceReport};
pub use size::{SizeEstimate, SizeGuard, ENTRY_OVERHEAD_BYTES};
pub use stats::{CacheStats, CacheSummary};
