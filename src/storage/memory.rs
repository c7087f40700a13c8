//! In-process storage backends for development and tests

use super::errors::{StorageError, StorageResult};
use super::traits::{BlobStore, ConfigurationStore, DatasetStore, EvalRunStore};
use crate::models::{ConfigurationKey, DatasetMetadata, EvalRun, MetricsConfiguration};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// Blob store keeping every container as a sorted map of path to bytes
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    containers: RwLock<HashMap<String, BTreeMap<String, Vec<u8>>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blob_count(&self, container: &str) -> usize {
        self.containers
            .read()
            .get(container)
            .map_or(0, BTreeMap::len)
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn exists(&self, container: &str, path: &str) -> StorageResult<bool> {
        Ok(self
            .containers
            .read()
            .get(container)
            .is_some_and(|blobs| blobs.contains_key(path)))
    }

    async fn read(&self, container: &str, path: &str) -> StorageResult<Vec<u8>> {
        self.containers
            .read()
            .get(container)
            .and_then(|blobs| blobs.get(path).cloned())
            .ok_or_else(|| StorageError::not_found("Blob", format!("{container}/{path}")))
    }

    async fn write(&self, container: &str, path: &str, bytes: Vec<u8>) -> StorageResult<()> {
        self.containers
            .write()
            .entry(container.to_string())
            .or_default()
            .insert(path.to_string(), bytes);
        Ok(())
    }

    async fn list(&self, container: &str, prefix: &str) -> StorageResult<Vec<String>> {
        Ok(self
            .containers
            .read()
            .get(container)
            .map(|blobs| {
                blobs
                    .range(prefix.to_string()..)
                    .take_while(|(path, _)| path.starts_with(prefix))
                    .map(|(path, _)| path.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete(&self, container: &str, path: &str) -> StorageResult<bool> {
        Ok(self
            .containers
            .write()
            .get_mut(container)
            .is_some_and(|blobs| blobs.remove(path).is_some()))
    }
}

#[derive(Debug, Default)]
struct Tables {
    eval_runs: HashMap<Uuid, EvalRun>,
    configurations: HashMap<Uuid, MetricsConfiguration>,
    datasets: HashMap<Uuid, DatasetMetadata>,
}

/// Metadata store implementing all table traits over in-process maps
///
/// Enforces the same constraints as the PostgreSQL schema: unique eval run
/// ids, unique configuration keys and version-checked eval run updates.
#[derive(Debug, Default)]
pub struct InMemoryMetadataStore {
    tables: RwLock<Tables>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EvalRunStore for InMemoryMetadataStore {
    async fn insert(&self, run: &EvalRun) -> StorageResult<()> {
        let mut tables = self.tables.write();
        if tables.eval_runs.contains_key(&run.eval_run_id) {
            return Err(StorageError::Conflict {
                entity: "EvalRun",
                message: format!("eval run {} already exists", run.eval_run_id),
            });
        }
        tables.eval_runs.insert(run.eval_run_id, run.clone());
        Ok(())
    }

    async fn get_by_id(&self, eval_run_id: Uuid) -> StorageResult<Option<EvalRun>> {
        Ok(self.tables.read().eval_runs.get(&eval_run_id).cloned())
    }

    async fn list_by_agent(&self, agent_id: &str) -> StorageResult<Vec<EvalRun>> {
        let mut runs: Vec<EvalRun> = self
            .tables
            .read()
            .eval_runs
            .values()
            .filter(|run| run.agent_id == agent_id)
            .cloned()
            .collect();
        runs.sort_by(|a, b| b.last_updated_at.cmp(&a.last_updated_at));
        Ok(runs)
    }

    async fn update_if_version(
        &self,
        run: &EvalRun,
        expected_version: i64,
    ) -> StorageResult<EvalRun> {
        let mut tables = self.tables.write();
        let stored = tables
            .eval_runs
            .get_mut(&run.eval_run_id)
            .ok_or_else(|| StorageError::not_found("EvalRun", run.eval_run_id))?;

        if stored.version != expected_version {
            return Err(StorageError::VersionMismatch {
                entity: "EvalRun",
                id: run.eval_run_id.to_string(),
                expected: expected_version,
            });
        }

        let mut next = run.clone();
        next.version = expected_version + 1;
        *stored = next.clone();
        Ok(next)
    }
}

#[async_trait]
impl ConfigurationStore for InMemoryMetadataStore {
    async fn get_by_id(&self, configuration_id: Uuid) -> StorageResult<Option<MetricsConfiguration>> {
        Ok(self
            .tables
            .read()
            .configurations
            .get(&configuration_id)
            .cloned())
    }

    async fn get_by_key(
        &self,
        key: &ConfigurationKey,
    ) -> StorageResult<Option<MetricsConfiguration>> {
        Ok(self
            .tables
            .read()
            .configurations
            .values()
            .find(|configuration| configuration.key() == *key)
            .cloned())
    }

    async fn list_by_agent(&self, agent_id: &str) -> StorageResult<Vec<MetricsConfiguration>> {
        let mut configurations: Vec<MetricsConfiguration> = self
            .tables
            .read()
            .configurations
            .values()
            .filter(|configuration| configuration.agent_id == agent_id)
            .cloned()
            .collect();
        configurations.sort_by(|a, b| {
            (&a.configuration_name, &a.environment_name)
                .cmp(&(&b.configuration_name, &b.environment_name))
        });
        Ok(configurations)
    }

    async fn upsert(&self, configuration: &MetricsConfiguration) -> StorageResult<()> {
        let mut tables = self.tables.write();
        let key = configuration.key();
        let taken = tables.configurations.values().any(|existing| {
            existing.configuration_id != configuration.configuration_id && existing.key() == key
        });
        if taken {
            return Err(StorageError::Conflict {
                entity: "MetricsConfiguration",
                message: format!("configuration key {key} already exists"),
            });
        }
        tables
            .configurations
            .insert(configuration.configuration_id, configuration.clone());
        Ok(())
    }

    async fn delete(&self, configuration_id: Uuid) -> StorageResult<bool> {
        Ok(self
            .tables
            .write()
            .configurations
            .remove(&configuration_id)
            .is_some())
    }
}

#[async_trait]
impl DatasetStore for InMemoryMetadataStore {
    async fn get_by_id(&self, dataset_id: Uuid) -> StorageResult<Option<DatasetMetadata>> {
        Ok(self.tables.read().datasets.get(&dataset_id).cloned())
    }

    async fn list_by_agent(&self, agent_id: &str) -> StorageResult<Vec<DatasetMetadata>> {
        let mut datasets: Vec<DatasetMetadata> = self
            .tables
            .read()
            .datasets
            .values()
            .filter(|dataset| dataset.agent_id == agent_id)
            .cloned()
            .collect();
        datasets.sort_by(|a, b| b.last_updated_at.cmp(&a.last_updated_at));
        Ok(datasets)
    }

    async fn upsert(&self, dataset: &DatasetMetadata) -> StorageResult<()> {
        self.tables
            .write()
            .datasets
            .insert(dataset.dataset_id, dataset.clone());
        Ok(())
    }

    async fn delete(&self, dataset_id: Uuid) -> StorageResult<bool> {
        Ok(self.tables.write().datasets.remove(&dataset_id).is_some())
    }
}
