//! Cache provider with enum dispatch and graceful degradation
//!
//! Consumers hold a `CacheProvider` and never see which backend is behind it.
//! Construction never fails: a disabled, unknown or unreachable backend
//! degrades to NoOp with a warning, so the service starts without a cache
//! rather than not at all.

use super::errors::CacheResult;
use super::providers::{InMemoryCacheService, NoOpCacheService};
use super::traits::CacheService;
use crate::config::CacheConfig;
use std::time::Duration;
use tracing::{info, warn};

#[cfg(feature = "cache-redis")]
use super::providers::RedisCacheService;

/// Internal cache backend enum for zero-cost dispatch
#[derive(Debug, Clone)]
enum CacheBackend {
    /// Redis cache provider (boxed to reduce enum size)
    #[cfg(feature = "cache-redis")]
    Redis(Box<RedisCacheService>),

    /// In-process cache with per-entry TTL
    Memory(InMemoryCacheService),

    /// No-op cache provider (always miss, always succeed)
    NoOp(NoOpCacheService),
}

/// Unified cache handle over the configured backend
#[derive(Debug, Clone)]
pub struct CacheProvider {
    backend: CacheBackend,
}

impl CacheProvider {
    /// Create a cache provider from configuration with graceful degradation
    pub async fn from_config_graceful(config: &CacheConfig) -> Self {
        let backend = Self::create_backend(config).await;
        info!(
            provider = backend_name(&backend),
            "Cache provider initialized"
        );
        Self { backend }
    }

    async fn create_backend(config: &CacheConfig) -> CacheBackend {
        if !config.enabled {
            info!("Cache disabled by configuration");
            return CacheBackend::NoOp(NoOpCacheService::new());
        }

        match config.backend.to_ascii_lowercase().as_str() {
            "redis" => Self::create_redis_backend(config).await,
            "memory" | "in-memory" => {
                CacheBackend::Memory(InMemoryCacheService::new(config.max_entries))
            }
            "noop" | "none" => CacheBackend::NoOp(NoOpCacheService::new()),
            other => {
                warn!(
                    backend = other,
                    "Unknown cache backend, falling back to NoOp"
                );
                CacheBackend::NoOp(NoOpCacheService::new())
            }
        }
    }

    /// Attempt to create a Redis backend, falling back to NoOp on failure
    #[cfg(feature = "cache-redis")]
    async fn create_redis_backend(config: &CacheConfig) -> CacheBackend {
        let Some(redis_config) = &config.redis else {
            warn!("Redis cache enabled but no [cache.redis] config found, falling back to NoOp");
            return CacheBackend::NoOp(NoOpCacheService::new());
        };

        match RedisCacheService::from_config(redis_config).await {
            Ok(service) => CacheBackend::Redis(Box::new(service)),
            Err(e) => {
                warn!(
                    error = %e,
                    "Failed to connect to Redis, falling back to NoOp cache (graceful degradation)"
                );
                CacheBackend::NoOp(NoOpCacheService::new())
            }
        }
    }

    /// Fallback when cache-redis feature is not enabled
    #[cfg(not(feature = "cache-redis"))]
    async fn create_redis_backend(_config: &CacheConfig) -> CacheBackend {
        warn!("Redis cache backend requested but 'cache-redis' feature not enabled, using NoOp");
        CacheBackend::NoOp(NoOpCacheService::new())
    }

    /// Create a NoOp provider (for explicit opt-out or testing)
    pub fn noop() -> Self {
        Self {
            backend: CacheBackend::NoOp(NoOpCacheService::new()),
        }
    }

    /// Create an in-process provider
    pub fn in_memory(max_entries: usize) -> Self {
        Self {
            backend: CacheBackend::Memory(InMemoryCacheService::new(max_entries)),
        }
    }

    /// Check if caching is actually enabled (not NoOp)
    pub fn is_enabled(&self) -> bool {
        !matches!(self.backend, CacheBackend::NoOp(_))
    }
}

fn backend_name(backend: &CacheBackend) -> &'static str {
    match backend {
        #[cfg(feature = "cache-redis")]
        CacheBackend::Redis(s) => s.provider_name(),
        CacheBackend::Memory(s) => s.provider_name(),
        CacheBackend::NoOp(s) => s.provider_name(),
    }
}

impl CacheService for CacheProvider {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        match &self.backend {
            #[cfg(feature = "cache-redis")]
            CacheBackend::Redis(s) => s.get(key).await,
            CacheBackend::Memory(s) => s.get(key).await,
            CacheBackend::NoOp(s) => s.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        match &self.backend {
            #[cfg(feature = "cache-redis")]
            CacheBackend::Redis(s) => s.set(key, value, ttl).await,
            CacheBackend::Memory(s) => s.set(key, value, ttl).await,
            CacheBackend::NoOp(s) => s.set(key, value, ttl).await,
        }
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        match &self.backend {
            #[cfg(feature = "cache-redis")]
            CacheBackend::Redis(s) => s.delete(key).await,
            CacheBackend::Memory(s) => s.delete(key).await,
            CacheBackend::NoOp(s) => s.delete(key).await,
        }
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        match &self.backend {
            #[cfg(feature = "cache-redis")]
            CacheBackend::Redis(s) => s.exists(key).await,
            CacheBackend::Memory(s) => s.exists(key).await,
            CacheBackend::NoOp(s) => s.exists(key).await,
        }
    }

    async fn health_check(&self) -> CacheResult<bool> {
        match &self.backend {
            #[cfg(feature = "cache-redis")]
            CacheBackend::Redis(s) => s.health_check().await,
            CacheBackend::Memory(s) => s.health_check().await,
            CacheBackend::NoOp(s) => s.health_check().await,
        }
    }

    fn provider_name(&self) -> &'static str {
        backend_name(&self.backend)
    }
}
