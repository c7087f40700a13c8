//! In-process cache provider
//!
//! DashMap-backed cache with per-entry expiry, for single-instance deployments
//! and tests. Unlike a cache-wide TTL this honours the TTL passed to each
//! `set`, which negative caching relies on (not-found markers expire sooner
//! than positive entries).
//!
//! **Important**: state is per process. Invalidations issued by another
//! instance are not observed.

use crate::cache::errors::CacheResult;
use crate::cache::traits::CacheService;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// In-memory cache service with per-entry TTL and a capacity bound
#[derive(Clone)]
pub struct InMemoryCacheService {
    entries: Arc<DashMap<String, Entry>>,
    max_entries: usize,
}

impl std::fmt::Debug for InMemoryCacheService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCacheService")
            .field("max_entries", &self.max_entries)
            .field("entry_count", &self.entries.len())
            .finish()
    }
}

impl InMemoryCacheService {
    pub fn new(max_entries: usize) -> Self {
        debug!(max_entries = max_entries, "In-memory cache service created");
        Self {
            entries: Arc::new(DashMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    /// Number of stored entries, including ones that expired but were not yet purged
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Make room for one more entry: drop expired entries first, then the
    /// entry closest to expiry.
    fn make_room(&self) {
        if self.entries.len() < self.max_entries {
            return;
        }

        let now = Instant::now();
        self.entries.retain(|_, entry| !entry.is_expired(now));

        while self.entries.len() >= self.max_entries {
            let victim = self
                .entries
                .iter()
                .min_by_key(|entry| entry.value().expires_at)
                .map(|entry| entry.key().clone());
            match victim {
                Some(key) => {
                    self.entries.remove(&key);
                    debug!(key = %key, "Cache EVICT (memory)");
                }
                None => break,
            }
        }
    }

    /// Live value for `key`, removing it when expired
    fn live_value(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        // The read guard must be released before removing from the same shard
        let lookup = self
            .entries
            .get(key)
            .map(|entry| (entry.is_expired(now), entry.value.clone()));

        match lookup {
            Some((false, value)) => Some(value),
            Some((true, _)) => {
                self.entries.remove_if(key, |_, entry| entry.is_expired(now));
                None
            }
            None => None,
        }
    }
}

impl CacheService for InMemoryCacheService {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let result = self.live_value(key);

        if result.is_some() {
            debug!(key = key, "Cache HIT (memory)");
        } else {
            debug!(key = key, "Cache MISS (memory)");
        }

        Ok(result)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        if !self.entries.contains_key(key) {
            self.make_room();
        }

        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );

        debug!(key = key, ttl_seconds = ttl.as_secs(), "Cache SET (memory)");
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.entries.remove(key);
        debug!(key = key, "Cache DEL (memory)");
        Ok(())
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        Ok(self.live_value(key).is_some())
    }

    async fn health_check(&self) -> CacheResult<bool> {
        Ok(true)
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}
