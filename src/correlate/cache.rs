// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Expiring key/value map.
//!
//! # Guarantees
//! - An entry is visible for exactly `ttl` after its last insert.
//! - Expired entries are never returned, whether or not a sweep has run.

use crate::clock::Clock;
use rustc_hash::FxHashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

pub struct TtlCache<K, V> {
    entries: FxHashMap<K, Entry<V>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<K: Eq + Hash, V> TtlCache<K, V> {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: FxHashMap::default(),
            ttl,
            clock,
        }
    }

    /// Insert or overwrite. The entry's lifetime restarts.
    pub fn insert(&mut self, key: K, value: V) {
        let expires_at = self.clock.now() + self.ttl;
        self.entries.insert(key, Entry { value, expires_at });
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        let now = self.clock.now();
        self.entries
            .get(key)
            .filter(|e| e.expires_at > now)
            .map(|e| &e.value)
    }

    /// Remove and return a live entry. An expired entry is removed and discarded.
    pub fn take(&mut self, key: &K) -> Option<V> {
        let entry = self.entries.remove(key)?;
        if entry.expires_at > self.clock.now() {
            Some(entry.value)
        } else {
            None
        }
    }

    /// Drop every expired entry. Returns how many were dropped.
    pub fn sweep(&mut self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, e| e.expires_at > now);
        before - self.entries.len()
    }

    /// Entries held, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn test_entry_expires_without_sweep() {
        let clock = Arc::new(ManualClock::new());
        let mut cache = TtlCache::new(Duration::from_secs(10), clock.clone());
        cache.insert("k", 1);

        clock.advance(Duration::from_secs(9));
        assert_eq!(cache.get(&"k"), Some(&1));

        clock.advance(Duration::from_secs(1));
        assert_eq!(cache.get(&"k"), None);
        assert_eq!(cache.take(&"k"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_reinsert_restarts_lifetime() {
        let clock = Arc::new(ManualClock::new());
        let mut cache = TtlCache::new(Duration::from_secs(10), clock.clone());
        cache.insert("k", 1);
        clock.advance(Duration::from_secs(8));
        cache.insert("k", 2);
        clock.advance(Duration::from_secs(8));

        assert_eq!(cache.take(&"k"), Some(2));
    }

    #[test]
    fn test_sweep_counts_evictions() {
        let clock = Arc::new(ManualClock::new());
        let mut cache = TtlCache::new(Duration::from_secs(10), clock.clone());
        cache.insert(1, "a");
        cache.insert(2, "b");
        clock.advance(Duration::from_secs(5));
        cache.insert(3, "c");
        clock.advance(Duration::from_secs(5));

        assert_eq!(cache.sweep(), 2);
        assert_eq!(cache.len(), 1);
    }
}
