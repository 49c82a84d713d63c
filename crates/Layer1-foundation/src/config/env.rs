//! Environment overrides for [`CacheConfig`]

use super::CacheConfig;
use crate::{Error, Result};
use std::str::FromStr;

pub const ENV_CAPACITY_BYTES: &str = "QUOTECACHE_CAPACITY_BYTES";
pub const ENV_FRESHNESS_SECS: &str = "QUOTECACHE_FRESHNESS_SECS";
pub const ENV_SWEEP_INTERVAL_SECS: &str = "QUOTECACHE_SWEEP_INTERVAL_SECS";
/// Comma-separated namespace list
pub const ENV_NAMESPACES: &str = "QUOTECACHE_NAMESPACES";

impl CacheConfig {
    /// Apply `QUOTECACHE_*` variables from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary lookup (the environment in production)
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_CAPACITY_BYTES) {
            self.capacity_bytes = parse_var(ENV_CAPACITY_BYTES, &value)?;
        }
        if let Some(value) = lookup(ENV_FRESHNESS_SECS) {
            self.freshness_secs = parse_var(ENV_FRESHNESS_SECS, &value)?;
        }
        if let Some(value) = lookup(ENV_SWEEP_INTERVAL_SECS) {
            self.sweep_interval_secs = parse_var(ENV_SWEEP_INTERVAL_SECS, &value)?;
        }
        if let Some(value) = lookup(ENV_NAMESPACES) {
            self.namespaces = value
                .split(',')
                .map(str::trim)
                .filter(|ns| !ns.is_empty())
                .map(str::to_string)
                .collect();
        }
        self.validate()
    }
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{} has an invalid value: {:?}", name, value)))
}
