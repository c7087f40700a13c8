//! Storage collaborator contracts
//!
//! The orchestrator only talks to storage through these traits, so blob and
//! metadata backends can be swapped (in-memory for tests, filesystem, PostgreSQL).

use super::errors::StorageResult;
use crate::models::{ConfigurationKey, DatasetMetadata, EvalRun, MetricsConfiguration};
use async_trait::async_trait;
use uuid::Uuid;

/// Container/path addressed binary store
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn exists(&self, container: &str, path: &str) -> StorageResult<bool>;

    /// Read a blob; `StorageError::NotFound` when absent
    async fn read(&self, container: &str, path: &str) -> StorageResult<Vec<u8>>;

    /// Create or replace a blob, creating the container on demand
    async fn write(&self, container: &str, path: &str, bytes: Vec<u8>) -> StorageResult<()>;

    /// Paths in `container` starting with `prefix`, in lexicographic order
    async fn list(&self, container: &str, prefix: &str) -> StorageResult<Vec<String>>;

    /// Remove a blob; returns whether it existed
    async fn delete(&self, container: &str, path: &str) -> StorageResult<bool>;
}

/// Eval run table
#[async_trait]
pub trait EvalRunStore: Send + Sync {
    /// Insert a new run; `StorageError::Conflict` if the id is taken
    async fn insert(&self, run: &EvalRun) -> StorageResult<()>;

    async fn get_by_id(&self, eval_run_id: Uuid) -> StorageResult<Option<EvalRun>>;

    /// An agent's runs, newest first
    async fn list_by_agent(&self, agent_id: &str) -> StorageResult<Vec<EvalRun>>;

    /// Replace the stored run if its version still equals `expected_version`.
    ///
    /// Returns the stored run with its incremented version.
    /// `StorageError::VersionMismatch` when another writer got there first.
    async fn update_if_version(
        &self,
        run: &EvalRun,
        expected_version: i64,
    ) -> StorageResult<EvalRun>;
}

/// Metrics configuration table, unique on [`ConfigurationKey`]
#[async_trait]
pub trait ConfigurationStore: Send + Sync {
    async fn get_by_id(&self, configuration_id: Uuid) -> StorageResult<Option<MetricsConfiguration>>;

    async fn get_by_key(&self, key: &ConfigurationKey)
        -> StorageResult<Option<MetricsConfiguration>>;

    async fn list_by_agent(&self, agent_id: &str) -> StorageResult<Vec<MetricsConfiguration>>;

    /// Insert or replace by `configuration_id`.
    ///
    /// `StorageError::Conflict` when the composite key belongs to a different id.
    async fn upsert(&self, configuration: &MetricsConfiguration) -> StorageResult<()>;

    /// Returns whether a record was removed
    async fn delete(&self, configuration_id: Uuid) -> StorageResult<bool>;
}

/// Dataset metadata table
#[async_trait]
pub trait DatasetStore: Send + Sync {
    async fn get_by_id(&self, dataset_id: Uuid) -> StorageResult<Option<DatasetMetadata>>;

    async fn list_by_agent(&self, agent_id: &str) -> StorageResult<Vec<DatasetMetadata>>;

    async fn upsert(&self, dataset: &DatasetMetadata) -> StorageResult<()>;

    /// Returns whether a record was removed
    async fn delete(&self, dataset_id: Uuid) -> StorageResult<bool>;
}
