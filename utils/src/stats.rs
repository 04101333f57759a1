//! Counters for node activity.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

/// A fixed set of thread-safe counters keyed by `K`.
///
/// Keys not registered at construction are ignored.
pub struct StatsCounter<K> {
    counters: HashMap<K, AtomicU64>,
}

impl<K: Copy + Eq + Hash> StatsCounter<K> {
    pub fn new(keys: &[K]) -> Self {
        Self {
            counters: keys.iter().map(|&k| (k, AtomicU64::new(0))).collect(),
        }
    }

    pub fn increment(&self, key: K) {
        self.add(key, 1);
    }

    pub fn add(&self, key: K, value: u64) {
        if let Some(counter) = self.counters.get(&key) {
            counter.fetch_add(value, Ordering::Relaxed);
        }
    }

    pub fn get(&self, key: K) -> u64 {
        self.counters
            .get(&key)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn snapshot(&self) -> HashMap<K, u64> {
        self.counters
            .iter()
            .map(|(&k, v)| (k, v.load(Ordering::Relaxed)))
            .collect()
    }
}
