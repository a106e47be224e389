//! In-memory TTL cache backed by `DashMap` for concurrent access.

use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

/// A single cached value with its expiration time.
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// Thread-safe in-memory cache with per-entry time-to-live.
///
/// Expiry is computed when the value is stored, so a slow fetch does not
/// eat into its own freshness window. Expired entries are lazily evicted
/// on the next `get` call for that key.
pub struct MemoryCache<V> {
    store: DashMap<String, CacheEntry<V>>,
}

impl<V> Default for MemoryCache<V> {
    fn default() -> Self {
        Self {
            store: DashMap::new(),
        }
    }
}

impl<V: Clone> MemoryCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached value for `key`, or `None` if missing or expired.
    pub fn get(&self, key: &str) -> Option<V> {
        let entry = self.store.get(key)?;
        if Instant::now() >= entry.expires_at {
            drop(entry);
            // Only evict if no fresh value was stored after the guard dropped.
            self.store
                .remove_if(key, |_, e| Instant::now() >= e.expires_at);
            return None;
        }
        Some(entry.value.clone())
    }

    /// Inserts or overwrites an entry that expires `ttl` from now.
    pub fn set_with_ttl(&self, key: String, value: V, ttl: Duration) {
        self.store.insert(
            key,
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Removes all entries from the cache.
    pub fn clear(&self) {
        self.store.clear();
    }
}
