//! Collaborator doubles: failing backends and call-counting stores
#![allow(dead_code)]

use async_trait::async_trait;
use evalplatform_core::cache::{CacheError, CacheResult, CacheService};
use evalplatform_core::models::EvalRun;
use evalplatform_core::storage::{
    BlobStore, EvalRunStore, InMemoryBlobStore, InMemoryMetadataStore, StorageError,
    StorageResult,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Cache whose every operation fails, as when the backend is unreachable
#[derive(Debug, Default, Clone)]
pub struct FailingCache;

impl CacheService for FailingCache {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        Err(CacheError::Unreachable("connection refused".to_string()))
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> CacheResult<()> {
        Err(CacheError::Unreachable("connection refused".to_string()))
    }

    async fn delete(&self, _key: &str) -> CacheResult<()> {
        Err(CacheError::Unreachable("connection refused".to_string()))
    }

    async fn exists(&self, _key: &str) -> CacheResult<bool> {
        Err(CacheError::Unreachable("connection refused".to_string()))
    }

    async fn health_check(&self) -> CacheResult<bool> {
        Ok(false)
    }

    fn provider_name(&self) -> &'static str {
        "failing"
    }
}

/// Blob store that rejects every call
#[derive(Debug, Default)]
pub struct FailingBlobStore;

#[async_trait]
impl BlobStore for FailingBlobStore {
    async fn exists(&self, _container: &str, _path: &str) -> StorageResult<bool> {
        Err(StorageError::backend("exists", "blob service unavailable"))
    }

    async fn read(&self, _container: &str, _path: &str) -> StorageResult<Vec<u8>> {
        Err(StorageError::backend("read", "blob service unavailable"))
    }

    async fn write(&self, _container: &str, _path: &str, _bytes: Vec<u8>) -> StorageResult<()> {
        Err(StorageError::backend("write", "blob service unavailable"))
    }

    async fn list(&self, _container: &str, _prefix: &str) -> StorageResult<Vec<String>> {
        Err(StorageError::backend("list", "blob service unavailable"))
    }

    async fn delete(&self, _container: &str, _path: &str) -> StorageResult<bool> {
        Err(StorageError::backend("delete", "blob service unavailable"))
    }
}

/// Blob store that works normally until asked to delete something
#[derive(Debug, Default)]
pub struct UndeletableBlobStore {
    inner: InMemoryBlobStore,
}

impl UndeletableBlobStore {
    pub fn blob_count(&self, container: &str) -> usize {
        self.inner.blob_count(container)
    }
}

#[async_trait]
impl BlobStore for UndeletableBlobStore {
    async fn exists(&self, container: &str, path: &str) -> StorageResult<bool> {
        self.inner.exists(container, path).await
    }

    async fn read(&self, container: &str, path: &str) -> StorageResult<Vec<u8>> {
        self.inner.read(container, path).await
    }

    async fn write(&self, container: &str, path: &str, bytes: Vec<u8>) -> StorageResult<()> {
        self.inner.write(container, path, bytes).await
    }

    async fn list(&self, container: &str, prefix: &str) -> StorageResult<Vec<String>> {
        self.inner.list(container, prefix).await
    }

    async fn delete(&self, _container: &str, _path: &str) -> StorageResult<bool> {
        Err(StorageError::backend("delete", "blob lease held by another client"))
    }
}

/// Eval run store that counts `get_by_id` calls before delegating
#[derive(Debug, Default)]
pub struct CountingEvalRunStore {
    inner: InMemoryMetadataStore,
    reads: AtomicUsize,
}

impl CountingEvalRunStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EvalRunStore for CountingEvalRunStore {
    async fn insert(&self, run: &EvalRun) -> StorageResult<()> {
        EvalRunStore::insert(&self.inner, run).await
    }

    async fn get_by_id(&self, eval_run_id: Uuid) -> StorageResult<Option<EvalRun>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        EvalRunStore::get_by_id(&self.inner, eval_run_id).await
    }

    async fn list_by_agent(&self, agent_id: &str) -> StorageResult<Vec<EvalRun>> {
        EvalRunStore::list_by_agent(&self.inner, agent_id).await
    }

    async fn update_if_version(
        &self,
        run: &EvalRun,
        expected_version: i64,
    ) -> StorageResult<EvalRun> {
        self.inner.update_if_version(run, expected_version).await
    }
}
