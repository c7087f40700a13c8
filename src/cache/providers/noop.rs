//! Cache provider that remembers nothing.
//!
//! Selected by `cache.backend = "noop"` and substituted for any backend that
//! fails to start. Every read misses and every negative-marker check answers
//! `false`, so each lookup goes to storage and a "not found" is re-checked
//! every time. Writes and invalidations succeed without effect, so the
//! orchestrator behaves as if the cache layer were absent.

use crate::cache::errors::CacheResult;
use crate::cache::traits::CacheService;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct NoOpCacheService;

impl NoOpCacheService {
    pub fn new() -> Self {
        Self
    }
}

impl CacheService for NoOpCacheService {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> CacheResult<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> CacheResult<()> {
        Ok(())
    }

    /// Never reports a negative marker
    async fn exists(&self, _key: &str) -> CacheResult<bool> {
        Ok(false)
    }

    async fn health_check(&self) -> CacheResult<bool> {
        Ok(true)
    }

    fn provider_name(&self) -> &'static str {
        "noop"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheAsideEngine, CacheKey, CacheTtl};
    use crate::constants::cache_prefixes;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_not_found_is_rechecked_on_every_lookup() {
        let engine = CacheAsideEngine::new(NoOpCacheService::new());
        let key = CacheKey::new(cache_prefixes::EVAL_RUN, "missing-run");
        let loads = AtomicUsize::new(0);

        for _ in 0..3 {
            let found: Result<Option<String>, ()> = engine
                .get_or_load(&key, CacheTtl::from_secs(900, 300), || async {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok(None)
                })
                .await;
            assert_eq!(found, Ok(None));
        }

        assert_eq!(loads.load(Ordering::SeqCst), 3);
        assert!(!engine.exists_negative(&key).await);
    }

    #[tokio::test]
    async fn test_found_entity_is_reloaded_from_source() {
        let engine = CacheAsideEngine::new(NoOpCacheService::new());
        let loads = AtomicUsize::new(0);

        for _ in 0..2 {
            let value: Result<u32, ()> = engine
                .get_or_set("dataset:7", Duration::from_secs(900), || async {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .await;
            assert_eq!(value, Ok(7));
        }

        assert_eq!(loads.load(Ordering::SeqCst), 2);
        assert_eq!(engine.metrics().backend_errors, 0);
    }

    #[tokio::test]
    async fn test_reports_healthy_under_its_own_name() {
        let svc = NoOpCacheService::new();
        assert!(svc.health_check().await.unwrap());
        assert_eq!(svc.provider_name(), "noop");
    }
}
