//! UID Cache - In-memory memo of identifier table lookups
//!
//! Maps (direction, kind, key) → resolved bytes. Entries are added on first
//! successful lookup and never evicted. One cache is shared by every task in
//! the process.
//!
//! The lock is never held across a store call, so two tasks missing on the
//! same key may both hit the store; the last insert wins. This is safe as long
//! as identifier tables are stable (an id always maps to the same name).

use crate::uid::{Lookup, UidKind};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    lookup: Lookup,
    kind: UidKind,
    key: Vec<u8>,
}

/// Process-wide cache of resolved identifiers
#[derive(Debug, Default)]
pub struct UidCache {
    entries: RwLock<HashMap<CacheKey, Vec<u8>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Snapshot of cache usage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

impl UidCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a cached value, counting the hit or miss
    pub async fn get(&self, lookup: Lookup, kind: UidKind, key: &[u8]) -> Option<Vec<u8>> {
        let cache_key = CacheKey {
            lookup,
            kind,
            key: key.to_vec(),
        };

        let found = self.entries.read().await.get(&cache_key).cloned();
        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    /// Store a resolved value
    pub async fn insert(&self, lookup: Lookup, kind: UidKind, key: &[u8], value: Vec<u8>) {
        let cache_key = CacheKey {
            lookup,
            kind,
            key: key.to_vec(),
        };
        self.entries.write().await.insert(cache_key, value);
    }

    /// Number of cached entries
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Check if the cache is empty
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Get usage counters
    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len().await,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_get() {
        let cache = UidCache::new();
        assert!(cache.is_empty().await);

        cache
            .insert(Lookup::Name, UidKind::Metric, &[0, 0, 1], b"sys.cpu".to_vec())
            .await;

        assert_eq!(
            cache.get(Lookup::Name, UidKind::Metric, &[0, 0, 1]).await,
            Some(b"sys.cpu".to_vec())
        );
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_keys_are_scoped_by_kind_and_direction() {
        let cache = UidCache::new();
        cache
            .insert(Lookup::Name, UidKind::Metric, &[0, 0, 1], b"sys.cpu".to_vec())
            .await;

        // Same raw bytes, different table column
        assert_eq!(cache.get(Lookup::Name, UidKind::TagKey, &[0, 0, 1]).await, None);
        assert_eq!(cache.get(Lookup::Id, UidKind::Metric, &[0, 0, 1]).await, None);
    }

    #[tokio::test]
    async fn test_stats() {
        let cache = UidCache::new();
        cache
            .insert(Lookup::Name, UidKind::TagValue, &[0, 0, 9], b"web01".to_vec())
            .await;

        cache.get(Lookup::Name, UidKind::TagValue, &[0, 0, 9]).await;
        cache.get(Lookup::Name, UidKind::TagValue, &[0, 0, 9]).await;
        cache.get(Lookup::Name, UidKind::TagValue, &[0, 0, 8]).await;

        let stats = cache.stats().await;
        assert_eq!(
            stats,
            CacheStats {
                entries: 1,
                hits: 2,
                misses: 1
            }
        );
    }
}
