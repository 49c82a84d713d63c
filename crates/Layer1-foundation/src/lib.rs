//! # quotecache-foundation
//!
//! Memoization cache for market and economic data lookups:
//! - Cache: three-level store (namespace → key → operation), memoizer,
//!   size guard, expiry purge and compaction sweeps
//! - Config: capacity, freshness window, sweep interval (TOML/JSON + env)
//! - Error: crate-wide error type
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  caller ─► Memoized::call(args)                          │
//! │                 │                                        │
//! │                 ▼                                        │
//! │           MemoCache ◄──── spawn_maintenance (tokio)      │
//! │                 │          purge + compact per tick      │
//! │          ┌──────┴──────┐                                 │
//! │          ▼             ▼                                 │
//! │     upstream op    Store (RwLock)                        │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod config;
pub mod error;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config
// ============================================================================
pub use config::{
    CacheConfig, ENV_CAPACITY_BYTES, ENV_FRESHNESS_SECS, ENV_NAMESPACES,
    ENV_SWEEP_INTERVAL_SECS,
};

// ============================================================================
// Cache
// ============================================================================
pub use cache::{
    // Memoizer
    keys,
    AsyncMemoized,
    Memoized,
    // Store
    CacheEntry,
    Coordinate,
    MemoCache,
    // Time
    Clock,
    ManualClock,
    SystemClock,
    // Size
    SizeEstimate,
    SizeGuard,
    // Maintenance
    spawn_maintenance,
    MaintenanceHandle,
    MaintenanceReport,
    // Reporting
    CacheStats,
    CacheSummary,
};
