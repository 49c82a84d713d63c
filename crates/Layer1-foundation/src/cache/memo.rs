//! Memoizer: wrap a read operation so it consults the cache first
//!
//! ```text
//! call(args)
//!   │ key_fn(&args) == None ──────────────► op(args)           (bypass)
//!   ▼
//! check(namespace, key, operation) ─ hit ─► cached payload     (op not run)
//!   │ miss
//!   ▼
//! op(args) ── Err(e) ─────────────────────► Err(e)             (nothing stored)
//!   │ Ok(payload)
//!   ▼
//! within_capacity? ─ yes ─► insert ─┐
//!   │ no (skip)                     ▼
//!   └──────────────────────────────► Ok(payload)
//! ```
//!
//! Concurrent misses on one coordinate may each run the operation; the last
//! insert wins. A cancelled async call (its future dropped) stores nothing.

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use tracing::{debug, warn};

use super::entry::Coordinate;
use super::manager::MemoCache;
use super::size::SizeEstimate;
use super::stats::Counters;
use crate::Error;

// ============================================================================
// Wrapping
// ============================================================================

impl<V> MemoCache<V> {
    /// Memoize a synchronous operation
    ///
    /// `operation` names the wrapped function; it becomes the third part of
    /// every coordinate this wrapper touches.
    pub fn wrap<A, E, K, F>(
        &self,
        namespace: impl Into<String>,
        operation: impl Into<String>,
        key_fn: K,
        op: F,
    ) -> Memoized<A, V, E, K, F>
    where
        K: Fn(&A) -> Option<String>,
        F: Fn(A) -> Result<V, E>,
    {
        Memoized {
            cache: self.clone(),
            namespace: namespace.into(),
            operation: operation.into(),
            key_fn,
            op,
            _marker: PhantomData,
        }
    }

    /// Memoize an async operation
    pub fn wrap_async<A, E, K, F, Fut>(
        &self,
        namespace: impl Into<String>,
        operation: impl Into<String>,
        key_fn: K,
        op: F,
    ) -> AsyncMemoized<A, V, E, K, F>
    where
        K: Fn(&A) -> Option<String>,
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        AsyncMemoized {
            cache: self.clone(),
            namespace: namespace.into(),
            operation: operation.into(),
            key_fn,
            op,
            _marker: PhantomData,
        }
    }
}

impl<V: Clone + SizeEstimate> MemoCache<V> {
    /// Look up a memoized coordinate, counting the hit or miss
    fn lookup(&self, coord: &Coordinate) -> crate::Result<Option<V>> {
        match self.check_at(coord)? {
            Some(entry) => {
                Counters::bump(&self.inner.counters.hits);
                debug!(coordinate = %coord, "memo hit");
                Ok(Some(entry.into_payload()))
            }
            None => {
                Counters::bump(&self.inner.counters.misses);
                debug!(coordinate = %coord, "memo miss");
                Ok(None)
            }
        }
    }

    /// Store a freshly computed payload if the size guard allows it
    ///
    /// Never fails the caller: the payload is already computed and correct.
    fn remember(&self, coord: &Coordinate, payload: &V) {
        let result = self.within_capacity().and_then(|within| {
            if within {
                self.insert_at(coord, payload.clone()).map(|_| true)
            } else {
                Ok(false)
            }
        });

        match result {
            Ok(true) => {}
            Ok(false) => {
                Counters::bump(&self.inner.counters.capacity_skips);
                debug!(coordinate = %coord, "cache over capacity, entry not stored");
            }
            Err(e) => warn!(coordinate = %coord, error = %e, "failed to store memoized result"),
        }
    }

    fn bypass(&self, namespace: &str, operation: &str) {
        Counters::bump(&self.inner.counters.bypasses);
        debug!(namespace, operation, "no cache key for arguments, bypassing");
    }
}

// ============================================================================
// Sync wrapper
// ============================================================================

/// A synchronous operation with transparent caching
pub struct Memoized<A, V, E, K, F> {
    cache: MemoCache<V>,
    namespace: String,
    operation: String,
    key_fn: K,
    op: F,
    _marker: PhantomData<fn(A) -> Result<V, E>>,
}

impl<A, V, E, K, F> Memoized<A, V, E, K, F>
where
    V: Clone + SizeEstimate,
    E: From<Error>,
    K: Fn(&A) -> Option<String>,
    F: Fn(A) -> Result<V, E>,
{
    /// Same contract as the wrapped operation
    pub fn call(&self, args: A) -> Result<V, E> {
        let Some(key) = (self.key_fn)(&args) else {
            self.cache.bypass(&self.namespace, &self.operation);
            return (self.op)(args);
        };

        let coord = Coordinate::new(self.namespace.as_str(), key, self.operation.as_str());
        if let Some(payload) = self.cache.lookup(&coord)? {
            return Ok(payload);
        }

        let payload = (self.op)(args)?;
        self.cache.remember(&coord, &payload);
        Ok(payload)
    }
}

impl<A, V, E, K, F> Memoized<A, V, E, K, F> {
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn cache(&self) -> &MemoCache<V> {
        &self.cache
    }
}

impl<A, V, E, K, F> fmt::Debug for Memoized<A, V, E, K, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoized")
            .field("namespace", &self.namespace)
            .field("operation", &self.operation)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Async wrapper
// ============================================================================

/// An async operation with transparent caching
pub struct AsyncMemoized<A, V, E, K, F> {
    cache: MemoCache<V>,
    namespace: String,
    operation: String,
    key_fn: K,
    op: F,
    _marker: PhantomData<fn(A) -> Result<V, E>>,
}

impl<A, V, E, K, F> AsyncMemoized<A, V, E, K, F>
where
    V: Clone + SizeEstimate,
    E: From<Error>,
    K: Fn(&A) -> Option<String>,
{
    /// Same contract as the wrapped operation
    pub async fn call<Fut>(&self, args: A) -> Result<V, E>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let Some(key) = (self.key_fn)(&args) else {
            self.cache.bypass(&self.namespace, &self.operation);
            return (self.op)(args).await;
        };

        let coord = Coordinate::new(self.namespace.as_str(), key, self.operation.as_str());
        if let Some(payload) = self.cache.lookup(&coord)? {
            return Ok(payload);
        }

        let payload = (self.op)(args).await?;
        self.cache.remember(&coord, &payload);
        Ok(payload)
    }
}

impl<A, V, E, K, F> AsyncMemoized<A, V, E, K, F> {
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn cache(&self) -> &MemoCache<V> {
        &self.cache
    }
}

impl<A, V, E, K, F> fmt::Debug for AsyncMemoized<A, V, E, K, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncMemoized")
            .field("namespace", &self.namespace)
            .field("operation", &self.operation)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Key derivation helpers
// ============================================================================

/// Ready-made `key_fn`s
pub mod keys {
    use serde_json::{Map, Value};

    /// Every call maps to the same key (e.g. a whole-market dataset)
    pub fn fixed<A>(key: impl Into<String>) -> impl Fn(&A) -> Option<String> + Clone {
        let key = key.into();
        move |_| Some(key.clone())
    }

    /// Never cache
    pub fn none<A>() -> impl Fn(&A) -> Option<String> + Clone {
        |_| None
    }

    /// Named-parameter arguments
    pub trait Params {
        fn param(&self, name: &str) -> Option<&Value>;
    }

    impl Params for Map<String, Value> {
        fn param(&self, name: &str) -> Option<&Value> {
            self.get(name)
        }
    }

    impl Params for Value {
        fn param(&self, name: &str) -> Option<&Value> {
            self.as_object()?.get(name)
        }
    }

    /// First of `names` present as a non-empty string parameter
    ///
    /// `first_param(&["symbol", "key"])` keys quote lookups by ticker and
    /// series lookups by series id; arguments with neither are not cached.
    pub fn first_param<P: Params>(
        names: &'static [&'static str],
    ) -> impl Fn(&P) -> Option<String> + Clone {
        move |params| {
            names.iter().find_map(|name| match params.param(name) {
                Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
                _ => None,
            })
        }
    }
}
