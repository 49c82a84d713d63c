//! Config - cache configuration
//!
//! - `mod.rs` - [`CacheConfig`], defaults, presets, file loading
//! - `env.rs` - environment overrides (`QUOTECACHE_*`)
//!
//! Configuration is static: it is read once when the process starts and
//! handed to [`MemoCache::new`](crate::cache::MemoCache::new).

mod env;

pub use env::{
    ENV_CAPACITY_BYTES, ENV_FRESHNESS_SECS, ENV_NAMESPACES, ENV_SWEEP_INTERVAL_SECS,
};

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const MIB: usize = 1024 * 1024;

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Approximate footprint (bytes) above which new entries are not stored
    #[serde(default = "default_capacity_bytes")]
    pub capacity_bytes: usize,

    /// Entries older than this are evicted by the next purge sweep (seconds)
    #[serde(default = "default_freshness_secs")]
    pub freshness_secs: u64,

    /// Period of the background maintainer (seconds)
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Namespaces registered up front; these are never removed
    #[serde(default = "default_namespaces")]
    pub namespaces: Vec<String>,
}

// Default value functions
fn default_capacity_bytes() -> usize {
    300 * MIB
}
fn default_freshness_secs() -> u64 {
    60
}
fn default_sweep_interval_secs() -> u64 {
    30
}
fn default_namespaces() -> Vec<String> {
    vec!["iex".to_string(), "sigma7".to_string()]
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity_bytes: default_capacity_bytes(),
            freshness_secs: default_freshness_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            namespaces: default_namespaces(),
        }
    }
}

impl CacheConfig {
    /// Small footprint for resource-constrained hosts
    pub fn minimal() -> Self {
        Self {
            capacity_bytes: 16 * MIB,
            freshness_secs: 30,
            sweep_interval_secs: 15,
            ..Default::default()
        }
    }

    /// Large footprint, longer freshness
    pub fn performance() -> Self {
        Self {
            capacity_bytes: 1024 * MIB,
            freshness_secs: 300,
            sweep_interval_secs: 60,
            ..Default::default()
        }
    }

    pub fn with_capacity_bytes(mut self, capacity_bytes: usize) -> Self {
        self.capacity_bytes = capacity_bytes;
        self
    }

    pub fn with_freshness(mut self, window: Duration) -> Self {
        self.freshness_secs = window.as_secs();
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval_secs = interval.as_secs();
        self
    }

    pub fn with_namespaces<I, S>(mut self, namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.namespaces = namespaces.into_iter().map(Into::into).collect();
        self
    }

    /// Freshness window as a Duration
    pub fn freshness_window(&self) -> Duration {
        Duration::from_secs(self.freshness_secs)
    }

    /// Sweep interval as a Duration
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    // ========================================================================
    // Load
    // ========================================================================

    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file: `.json` is parsed as JSON, anything else as TOML
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;

        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let config: Self = if is_json {
            serde_json::from_str(&content)
                .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?
        } else {
            toml::from_str(&content)
                .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Defaults with `QUOTECACHE_*` environment overrides applied
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Reject values the cache cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.freshness_secs == 0 {
            return Err(Error::Config("freshness_secs must be greater than 0".into()));
        }
        if self.sweep_interval_secs == 0 {
            return Err(Error::Config(
                "sweep_interval_secs must be greater than 0".into(),
            ));
        }
        if let Some(bad) = self.namespaces.iter().find(|ns| ns.trim().is_empty()) {
            return Err(Error::Config(format!("invalid namespace name: {:?}", bad)));
        }
        Ok(())
    }
}
