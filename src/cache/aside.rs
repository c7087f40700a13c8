//! Cache-aside engine with negative-result caching
//!
//! The engine checks the cache, and on a miss runs a caller-supplied factory
//! (usually a storage read) and populates the cache with its result. Lookups
//! that resolve to "not found" are recorded under the negative key with a
//! shorter TTL; the positive key never holds an absence sentinel.
//!
//! The cache is never a source of failures: a backend error on read is a
//! miss, and errors on write or invalidation are logged and dropped. Concurrent
//! misses on the same key may each run the factory; factories are idempotent
//! reads, so the cached value converges.

use super::keys::{CacheKey, CacheTtl};
use super::provider::CacheProvider;
use super::traits::CacheService;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Marker value stored under negative keys
const NEGATIVE_MARKER: &str = "1";

/// Lock-free engine counters
#[derive(Debug, Default)]
struct CacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    negative_hits: AtomicU64,
    factory_calls: AtomicU64,
    backend_errors: AtomicU64,
    invalidations: AtomicU64,
}

/// Point-in-time copy of the engine counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheMetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub negative_hits: u64,
    pub factory_calls: u64,
    pub backend_errors: u64,
    pub invalidations: u64,
}

impl CacheMetricsSnapshot {
    /// Fraction of lookups answered from the cache (positive or negative)
    pub fn hit_rate(&self) -> f64 {
        let answered = self.hits + self.negative_hits;
        let total = answered + self.misses;
        if total == 0 {
            0.0
        } else {
            answered as f64 / total as f64
        }
    }
}

/// Generic get-or-populate cache over any [`CacheService`]
#[derive(Debug, Clone)]
pub struct CacheAsideEngine<C: CacheService = CacheProvider> {
    cache: C,
    metrics: Arc<CacheMetrics>,
}

impl<C: CacheService> CacheAsideEngine<C> {
    pub fn new(cache: C) -> Self {
        Self {
            cache,
            metrics: Arc::new(CacheMetrics::default()),
        }
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn metrics(&self) -> CacheMetricsSnapshot {
        let m = &self.metrics;
        CacheMetricsSnapshot {
            hits: m.hits.load(Ordering::Relaxed),
            misses: m.misses.load(Ordering::Relaxed),
            negative_hits: m.negative_hits.load(Ordering::Relaxed),
            factory_calls: m.factory_calls.load(Ordering::Relaxed),
            backend_errors: m.backend_errors.load(Ordering::Relaxed),
            invalidations: m.invalidations.load(Ordering::Relaxed),
        }
    }

    /// Return the cached value for `key`, or run `factory` and cache its result.
    ///
    /// Factory errors are returned as-is and nothing is cached. When the cache
    /// backend cannot be read the factory result is returned uncached.
    pub async fn get_or_set<T, E, F, Fut>(&self, key: &str, ttl: Duration, factory: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let cache_available = match self.read::<T>(key).await {
            Lookup::Hit(value) => return Ok(value),
            Lookup::Miss => true,
            Lookup::Unavailable => false,
        };

        self.metrics.factory_calls.fetch_add(1, Ordering::Relaxed);
        let value = factory().await?;

        if cache_available {
            self.write(key, &value, ttl).await;
        }
        Ok(value)
    }

    /// Like [`get_or_set`](Self::get_or_set) for lookups that may resolve to
    /// "not found".
    ///
    /// The negative key is checked first and short-circuits to `Ok(None)`
    /// without running the factory. A factory result of `None` stores the
    /// negative marker with `ttl.negative`.
    pub async fn get_or_load<T, E, F, Fut>(
        &self,
        key: &CacheKey,
        ttl: CacheTtl,
        factory: F,
    ) -> Result<Option<T>, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
    {
        if self.exists_negative(key).await {
            return Ok(None);
        }

        let positive = key.positive();
        let cache_available = match self.read::<T>(&positive).await {
            Lookup::Hit(value) => return Ok(Some(value)),
            Lookup::Miss => true,
            Lookup::Unavailable => false,
        };

        self.metrics.factory_calls.fetch_add(1, Ordering::Relaxed);
        let loaded = factory().await?;

        if cache_available {
            match &loaded {
                Some(value) => self.write(&positive, value, ttl.positive).await,
                None => self.set_negative(key, ttl.negative).await,
            }
        }
        Ok(loaded)
    }

    /// Whether `key` is currently marked as not found
    pub async fn exists_negative(&self, key: &CacheKey) -> bool {
        let negative = key.negative();
        match self.cache.exists(&negative).await {
            Ok(true) => {
                self.metrics.negative_hits.fetch_add(1, Ordering::Relaxed);
                debug!(key = %negative, "Negative cache hit");
                true
            }
            Ok(false) => false,
            Err(e) => {
                self.metrics.backend_errors.fetch_add(1, Ordering::Relaxed);
                warn!(key = %negative, error = %e, "Cache exists check failed, treating as miss");
                false
            }
        }
    }

    /// Mark `key` as not found for `ttl`
    pub async fn set_negative(&self, key: &CacheKey, ttl: Duration) {
        let negative = key.negative();
        if let Err(e) = self.cache.set(&negative, NEGATIVE_MARKER, ttl).await {
            self.metrics.backend_errors.fetch_add(1, Ordering::Relaxed);
            warn!(key = %negative, error = %e, "Failed to store negative cache marker");
        }
    }

    /// Remove both the positive and the negative entry for `key`
    pub async fn invalidate(&self, key: &CacheKey) {
        self.metrics.invalidations.fetch_add(1, Ordering::Relaxed);
        self.delete_logged(&key.positive()).await;
        self.delete_logged(&key.negative()).await;
        debug!(key = %key, "Cache entry invalidated");
    }

    /// Invalidate every key in `keys`, one after another
    pub async fn invalidate_all<'a, I>(&self, keys: I)
    where
        I: IntoIterator<Item = &'a CacheKey>,
    {
        for key in keys {
            self.invalidate(key).await;
        }
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Lookup<T> {
        match self.cache.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    self.metrics.hits.fetch_add(1, Ordering::Relaxed);
                    Lookup::Hit(value)
                }
                Err(e) => {
                    // Unreadable entries (e.g. written by an older schema) are dropped
                    warn!(key = key, error = %e, "Discarding undecodable cache entry");
                    self.delete_logged(key).await;
                    self.metrics.misses.fetch_add(1, Ordering::Relaxed);
                    Lookup::Miss
                }
            },
            Ok(None) => {
                self.metrics.misses.fetch_add(1, Ordering::Relaxed);
                Lookup::Miss
            }
            Err(e) => {
                self.metrics.backend_errors.fetch_add(1, Ordering::Relaxed);
                self.metrics.misses.fetch_add(1, Ordering::Relaxed);
                warn!(key = key, error = %e, "Cache read failed, falling through to source");
                Lookup::Unavailable
            }
        }
    }

    async fn write<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = key, error = %e, "Failed to serialize value for cache");
                return;
            }
        };
        if let Err(e) = self.cache.set(key, &raw, ttl).await {
            self.metrics.backend_errors.fetch_add(1, Ordering::Relaxed);
            warn!(key = key, error = %e, "Cache write failed");
        }
    }

    async fn delete_logged(&self, key: &str) {
        if let Err(e) = self.cache.delete(key).await {
            self.metrics.backend_errors.fetch_add(1, Ordering::Relaxed);
            warn!(key = key, error = %e, "Cache delete failed");
        }
    }
}

enum Lookup<T> {
    Hit(T),
    Miss,
    Unavailable,
}
