//! Nested in-memory store: namespace → key → operation → entry
//!
//! Plain data with no locking of its own; [`MemoCache`](super::MemoCache)
//! owns it behind a single `RwLock`. The store keeps a running footprint
//! estimate so the size guard never has to walk the tree.

use std::collections::HashMap;
use std::time::Instant;

use super::entry::{CacheEntry, Coordinate};
use super::size::ENTRY_OVERHEAD_BYTES;

type OperationMap<V> = HashMap<String, CacheEntry<V>>;
type KeyMap<V> = HashMap<String, OperationMap<V>>;

#[derive(Debug)]
pub(crate) struct Store<V> {
    namespaces: HashMap<String, KeyMap<V>>,
    entries: usize,
    footprint_bytes: usize,
    next_generation: u64,
}

impl<V> Store<V> {
    pub(crate) fn new<I, S>(namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            namespaces: namespaces
                .into_iter()
                .map(|ns| (ns.into(), HashMap::new()))
                .collect(),
            entries: 0,
            footprint_bytes: 0,
            next_generation: 1,
        }
    }

    pub(crate) fn get(&self, coord: &Coordinate) -> Option<&CacheEntry<V>> {
        self.namespaces
            .get(&coord.namespace)?
            .get(&coord.key)?
            .get(&coord.operation)
    }

    /// Store a new entry, creating missing branches; returns the entry it replaced
    pub(crate) fn insert(
        &mut self,
        coord: &Coordinate,
        payload: V,
        created_at: Instant,
        size_bytes: usize,
    ) -> Option<CacheEntry<V>> {
        let generation = self.next_generation;
        self.next_generation += 1;

        let entry = CacheEntry::new(payload, created_at, generation, size_bytes);
        let replaced = self
            .namespaces
            .entry(coord.namespace.clone())
            .or_default()
            .entry(coord.key.clone())
            .or_default()
            .insert(coord.operation.clone(), entry);

        self.footprint_bytes += charge(coord, size_bytes);
        match &replaced {
            Some(old) => self.release(coord, old.size_bytes()),
            None => self.entries += 1,
        }
        replaced
    }

    pub(crate) fn remove(&mut self, coord: &Coordinate) -> Option<CacheEntry<V>> {
        let removed = self
            .namespaces
            .get_mut(&coord.namespace)?
            .get_mut(&coord.key)?
            .remove(&coord.operation)?;
        self.entries -= 1;
        self.release(coord, removed.size_bytes());
        Some(removed)
    }

    /// Remove the entry only if it is still the one stamped `generation`
    pub(crate) fn remove_if_generation(
        &mut self,
        coord: &Coordinate,
        generation: u64,
    ) -> Option<CacheEntry<V>> {
        let current = self
            .get(coord)
            .map(|entry| entry.generation() == generation)
            .unwrap_or(false);
        if current {
            self.remove(coord)
        } else {
            None
        }
    }

    /// Drop a key branch if it holds no operations right now
    pub(crate) fn remove_key_if_empty(&mut self, namespace: &str, key: &str) -> bool {
        let Some(keys) = self.namespaces.get_mut(namespace) else {
            return false;
        };
        let empty = keys.get(key).map(|ops| ops.is_empty()).unwrap_or(false);
        if empty {
            keys.remove(key);
        }
        empty
    }

    /// Remove every operation under a key branch (the branch stays, empty)
    pub(crate) fn clear_key(&mut self, namespace: &str, key: &str) -> usize {
        let Some(ops) = self
            .namespaces
            .get_mut(namespace)
            .and_then(|keys| keys.get_mut(key))
        else {
            return 0;
        };

        let drained: Vec<(String, CacheEntry<V>)> = ops.drain().collect();
        let count = drained.len();
        for (operation, entry) in drained {
            let coord = Coordinate::new(namespace, key, operation);
            self.release(&coord, entry.size_bytes());
        }
        self.entries -= count;
        count
    }

    /// Point-in-time list of every coordinate with its stamp
    pub(crate) fn snapshot(&self) -> Vec<(Coordinate, Instant, u64)> {
        let mut out = Vec::with_capacity(self.entries);
        for (namespace, keys) in &self.namespaces {
            for (key, ops) in keys {
                for (operation, entry) in ops {
                    out.push((
                        Coordinate::new(namespace.as_str(), key.as_str(), operation.as_str()),
                        entry.created_at(),
                        entry.generation(),
                    ));
                }
            }
        }
        out
    }

    /// Key branches that currently map to no operations
    pub(crate) fn empty_keys(&self) -> Vec<(String, String)> {
        self.namespaces
            .iter()
            .flat_map(|(namespace, keys)| {
                keys.iter()
                    .filter(|(_, ops)| ops.is_empty())
                    .map(move |(key, _)| (namespace.clone(), key.clone()))
            })
            .collect()
    }

    pub(crate) fn namespaces(&self) -> impl Iterator<Item = (&String, &KeyMap<V>)> {
        self.namespaces.iter()
    }

    pub(crate) fn has_key(&self, namespace: &str, key: &str) -> bool {
        self.namespaces
            .get(namespace)
            .map(|keys| keys.contains_key(key))
            .unwrap_or(false)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries
    }

    pub(crate) fn footprint_bytes(&self) -> usize {
        self.footprint_bytes
    }

    fn release(&mut self, coord: &Coordinate, size_bytes: usize) {
        self.footprint_bytes = self
            .footprint_bytes
            .saturating_sub(charge(coord, size_bytes));
    }
}

fn charge(coord: &Coordinate, size_bytes: usize) -> usize {
    ENTRY_OVERHEAD_BYTES + coord.text_len() + size_bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Store<&'static str> {
        Store::new(["iex", "sigma7"])
    }

    #[test]
    fn test_insert_creates_branches() {
        let mut store = store();
        let coord = Coordinate::new("fred", "GDP", "series");
        assert!(store.insert(&coord, "v1", Instant::now(), 10).is_none());

        assert_eq!(store.get(&coord).map(|e| *e.payload()), Some("v1"));
        assert!(store.has_key("fred", "GDP"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_replace_keeps_sibling_operations() {
        let mut store = store();
        let quote = Coordinate::new("iex", "MSFT", "quote");
        let news = Coordinate::new("iex", "MSFT", "news");
        store.insert(&quote, "q1", Instant::now(), 10);
        store.insert(&news, "n1", Instant::now(), 10);

        let replaced = store.insert(&quote, "q2", Instant::now(), 30);
        assert_eq!(replaced.map(|e| *e.payload()), Some("q1"));
        assert_eq!(store.get(&news).map(|e| *e.payload()), Some("n1"));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_footprint_tracks_mutations() {
        let mut store = store();
        let coord = Coordinate::new("iex", "MSFT", "quote");
        let base = ENTRY_OVERHEAD_BYTES + coord.text_len();

        store.insert(&coord, "a", Instant::now(), 100);
        assert_eq!(store.footprint_bytes(), base + 100);

        store.insert(&coord, "b", Instant::now(), 40);
        assert_eq!(store.footprint_bytes(), base + 40);

        store.remove(&coord);
        assert_eq!(store.footprint_bytes(), 0);
    }

    #[test]
    fn test_generations_increase() {
        let mut store = store();
        let coord = Coordinate::new("iex", "MSFT", "quote");
        store.insert(&coord, "a", Instant::now(), 1);
        let first = store.get(&coord).unwrap().generation();
        store.insert(&coord, "b", Instant::now(), 1);
        let second = store.get(&coord).unwrap().generation();
        assert!(second > first);

        assert!(store.remove_if_generation(&coord, first).is_none());
        assert!(store.remove_if_generation(&coord, second).is_some());
    }

    #[test]
    fn test_remove_key_if_empty() {
        let mut store = store();
        let coord = Coordinate::new("iex", "MSFT", "quote");
        store.insert(&coord, "a", Instant::now(), 1);

        assert!(!store.remove_key_if_empty("iex", "MSFT"));
        store.remove(&coord);
        assert_eq!(store.empty_keys(), vec![("iex".to_string(), "MSFT".to_string())]);
        assert!(store.remove_key_if_empty("iex", "MSFT"));
        assert!(!store.has_key("iex", "MSFT"));
        assert!(!store.remove_key_if_empty("nope", "MSFT"));
    }

    #[test]
    fn test_clear_key() {
        let mut store = store();
        store.insert(&Coordinate::new("iex", "MSFT", "quote"), "a", Instant::now(), 5);
        store.insert(&Coordinate::new("iex", "MSFT", "news"), "b", Instant::now(), 5);
        store.insert(&Coordinate::new("iex", "AAPL", "quote"), "c", Instant::now(), 5);

        assert_eq!(store.clear_key("iex", "MSFT"), 2);
        assert_eq!(store.len(), 1);
        assert!(store.has_key("iex", "MSFT"));
        assert_eq!(store.clear_key("iex", "GOOG"), 0);
    }
}
