//! # Request Orchestrator
//!
//! Services the eval-run, configuration, dataset and results use cases on top
//! of the storage collaborators. Each operation awaits its steps in order
//! (lookup, validate, write, invalidate) and returns a typed
//! [`EvalPlatformResult`].
//!
//! Reads go through the [`CacheAsideEngine`]; lookups that can miss use the
//! negative namespace. Every successful write invalidates the positive and
//! negative entries of each read path serving the written entity.

use super::types::{
    CreateEvalRunRequest, SaveConfigurationRequest, SaveDatasetRequest, UpdateStatusRequest,
};
use crate::artifacts::{sanitize_container_name, ArtifactKind, ArtifactLocationResolver, ArtifactReference};
use crate::cache::{CacheAsideEngine, CacheKey, CacheProvider, CacheService};
use crate::config::{CacheTtlConfig, EvalPlatformConfig};
use crate::configuration::{
    composite_cache_key, configuration_cache_keys, ConfigUpsertResolver, ConfigurationUpdate,
    UpsertOutcome,
};
use crate::constants::artifacts::{DATASETS_ROOT, JSON_EXTENSION};
use crate::constants::{cache_prefixes, SYSTEM_USER};
use crate::errors::{EvalPlatformError, EvalPlatformResult};
use crate::logging::{log_artifact_operation, log_eval_run_operation, log_metadata_operation};
use crate::models::{
    ConfigurationKey, DatasetItem, DatasetMetadata, EvalRun, MetricsConfiguration, NewEvalRun,
};
use crate::state_machine::StatusTransitionGuard;
use crate::storage::{
    blob_store_from_config, BlobStore, ConfigurationStore, DatasetStore, EvalRunStore,
    InMemoryMetadataStore, StorageError,
};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

/// Storage collaborators used by the orchestrator
#[derive(Clone)]
pub struct StorageBackends {
    pub eval_runs: Arc<dyn EvalRunStore>,
    pub configurations: Arc<dyn ConfigurationStore>,
    pub datasets: Arc<dyn DatasetStore>,
    pub blobs: Arc<dyn BlobStore>,
}

impl StorageBackends {
    /// All metadata tables in one store, plus the given blob store
    pub fn with_metadata_store<M>(metadata: Arc<M>, blobs: Arc<dyn BlobStore>) -> Self
    where
        M: EvalRunStore + ConfigurationStore + DatasetStore + 'static,
    {
        Self {
            eval_runs: metadata.clone(),
            configurations: metadata.clone(),
            datasets: metadata,
            blobs,
        }
    }

    /// In-process metadata and blob stores
    pub fn in_memory() -> Self {
        Self::with_metadata_store(
            Arc::new(InMemoryMetadataStore::new()),
            Arc::new(crate::storage::InMemoryBlobStore::new()),
        )
    }
}

impl std::fmt::Debug for StorageBackends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageBackends").finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct RequestOrchestrator<C: CacheService = CacheProvider> {
    storage: StorageBackends,
    cache: CacheAsideEngine<C>,
    ttl: CacheTtlConfig,
    guard: StatusTransitionGuard,
    artifacts: ArtifactLocationResolver,
    upserts: ConfigUpsertResolver,
}

impl RequestOrchestrator<CacheProvider> {
    /// Wire an orchestrator from configuration.
    ///
    /// The cache degrades to NoOp when unavailable. Metadata goes to PostgreSQL
    /// when `storage.database_url` is set and the `postgres` feature is on,
    /// otherwise to an in-process store.
    pub async fn from_config(config: &EvalPlatformConfig) -> EvalPlatformResult<Self> {
        let cache = CacheProvider::from_config_graceful(&config.cache).await;
        let blobs = blob_store_from_config(&config.storage)?;
        let storage = Self::metadata_backends(config, blobs).await?;
        Ok(Self::new(storage, cache, config))
    }

    #[cfg(feature = "postgres")]
    async fn metadata_backends(
        config: &EvalPlatformConfig,
        blobs: Arc<dyn BlobStore>,
    ) -> EvalPlatformResult<StorageBackends> {
        match config.storage.database_url.as_deref() {
            Some(url) => {
                let store = crate::storage::PgMetadataStore::connect(url).await?;
                info!("Metadata store initialized (postgres)");
                Ok(StorageBackends::with_metadata_store(Arc::new(store), blobs))
            }
            None => Ok(StorageBackends::with_metadata_store(
                Arc::new(InMemoryMetadataStore::new()),
                blobs,
            )),
        }
    }

    #[cfg(not(feature = "postgres"))]
    async fn metadata_backends(
        config: &EvalPlatformConfig,
        blobs: Arc<dyn BlobStore>,
    ) -> EvalPlatformResult<StorageBackends> {
        if config.storage.database_url.is_some() {
            return Err(EvalPlatformError::Configuration(
                "storage.database_url is set but the 'postgres' feature is not enabled".to_string(),
            ));
        }
        Ok(StorageBackends::with_metadata_store(
            Arc::new(InMemoryMetadataStore::new()),
            blobs,
        ))
    }
}

impl<C: CacheService> RequestOrchestrator<C> {
    pub fn new(storage: StorageBackends, cache: C, config: &EvalPlatformConfig) -> Self {
        let guard = StatusTransitionGuard::new(config.status.terminal_policy);
        info!(
            cache_provider = cache.provider_name(),
            terminal_policy = ?guard.policy(),
            "Request orchestrator initialized"
        );
        Self {
            artifacts: ArtifactLocationResolver::new(storage.blobs.clone()),
            upserts: ConfigUpsertResolver::new(storage.configurations.clone()),
            cache: CacheAsideEngine::new(cache),
            ttl: config.cache.ttl.clone(),
            guard,
            storage,
        }
    }

    pub fn cache(&self) -> &CacheAsideEngine<C> {
        &self.cache
    }

    pub fn guard(&self) -> StatusTransitionGuard {
        self.guard
    }

    // ========================================================================
    // EVAL RUNS
    // ========================================================================

    /// Submit a new eval run for an agent
    pub async fn create_eval_run(
        &self,
        request: CreateEvalRunRequest,
        user: &str,
    ) -> EvalPlatformResult<EvalRun> {
        request.validate()?;
        let agent_id = request.agent_id.trim().to_string();

        if let Some(configuration_id) = request.metrics_configuration_id {
            let configuration = self.get_configuration(configuration_id).await?;
            ensure_same_agent("MetricsConfiguration", &configuration.agent_id, &agent_id)?;
        }
        if let Some(dataset_id) = request.dataset_id {
            let dataset = self
                .storage
                .datasets
                .get_by_id(dataset_id)
                .await?
                .ok_or_else(|| EvalPlatformError::not_found("Dataset", dataset_id))?;
            ensure_same_agent("Dataset", &dataset.agent_id, &agent_id)?;
        }

        let container_name = sanitize_container_name(&agent_id)?;
        let run = EvalRun::submit(NewEvalRun {
            agent_id,
            metrics_configuration_id: request.metrics_configuration_id,
            dataset_id: request.dataset_id,
            container_name: Some(container_name),
            created_by: acting_user(user).to_string(),
        });

        self.storage.eval_runs.insert(&run).await?;
        self.cache.invalidate(&eval_run_key(run.eval_run_id)).await;

        log_eval_run_operation(
            "create",
            &run.eval_run_id.to_string(),
            Some(run.agent_id.as_str()),
            run.status.as_str(),
            None,
        );
        Ok(run)
    }

    pub async fn get_eval_run(&self, eval_run_id: Uuid) -> EvalPlatformResult<EvalRun> {
        let key = eval_run_key(eval_run_id);
        self.cache
            .get_or_load(&key, self.ttl.eval_run(), || async {
                self.storage
                    .eval_runs
                    .get_by_id(eval_run_id)
                    .await
                    .map_err(EvalPlatformError::from)
            })
            .await?
            .ok_or_else(|| EvalPlatformError::not_found("EvalRun", eval_run_id))
    }

    /// An agent's runs, newest first
    pub async fn get_eval_runs_by_agent(&self, agent_id: &str) -> EvalPlatformResult<Vec<EvalRun>> {
        let agent_id = require_agent_id(agent_id)?;
        Ok(self.storage.eval_runs.list_by_agent(agent_id).await?)
    }

    /// Validate and apply a status change.
    ///
    /// The current state is read from storage, not the cache, and the write is
    /// conditional on the version that was read. A concurrent writer turns
    /// this call into a retryable conflict instead of a silent overwrite.
    pub async fn update_status(
        &self,
        request: UpdateStatusRequest,
        user: &str,
    ) -> EvalPlatformResult<EvalRun> {
        request.validate()?;
        let eval_run_id = request.eval_run_id;

        let current = self
            .storage
            .eval_runs
            .get_by_id(eval_run_id)
            .await?
            .ok_or_else(|| EvalPlatformError::not_found("EvalRun", eval_run_id))?;

        // A terminal run stays terminal whatever version the caller holds, so
        // the guard runs before the token comparison.
        let target = self
            .guard
            .validate_transition(current.status, &request.status)?;

        if let Some(expected) = request.expected_version {
            if expected != current.version {
                return Err(EvalPlatformError::Conflict {
                    message: format!(
                        "EvalRun {eval_run_id} is at version {}, not {expected}",
                        current.version
                    ),
                    retryable: true,
                });
            }
        }

        let next = current.with_status(
            target,
            self.guard.is_terminal(target),
            acting_user(user),
        );

        let stored = self
            .storage
            .eval_runs
            .update_if_version(&next, current.version)
            .await?;
        self.cache.invalidate(&eval_run_key(eval_run_id)).await;

        log_eval_run_operation(
            "update_status",
            &eval_run_id.to_string(),
            Some(stored.agent_id.as_str()),
            stored.status.as_str(),
            Some(format!("from {}", current.status).as_str()),
        );
        Ok(stored)
    }

    /// The configuration a runner should evaluate `eval_run_id` with
    pub async fn get_metrics_configuration_for_run(
        &self,
        eval_run_id: Uuid,
    ) -> EvalPlatformResult<MetricsConfiguration> {
        let run = self.get_eval_run(eval_run_id).await?;
        let configuration_id = run.metrics_configuration_id.ok_or_else(|| {
            EvalPlatformError::not_found(
                "MetricsConfiguration",
                format!("for eval run {eval_run_id}"),
            )
        })?;
        self.get_configuration(configuration_id).await
    }

    // ========================================================================
    // RESULTS AND ENRICHED DATASETS
    // ========================================================================

    pub async fn save_results(
        &self,
        eval_run_id: Uuid,
        results: &serde_json::Value,
    ) -> EvalPlatformResult<ArtifactReference> {
        if !(results.is_object() || results.is_array()) {
            return Err(EvalPlatformError::validation(
                "Evaluation results must be a JSON object or array",
            ));
        }
        self.save_artifact(eval_run_id, ArtifactKind::Results, results)
            .await
    }

    pub async fn get_results(&self, eval_run_id: Uuid) -> EvalPlatformResult<serde_json::Value> {
        self.get_artifact(eval_run_id, ArtifactKind::Results).await
    }

    pub async fn save_enriched_dataset(
        &self,
        eval_run_id: Uuid,
        items: &[DatasetItem],
    ) -> EvalPlatformResult<ArtifactReference> {
        if items.is_empty() {
            return Err(EvalPlatformError::validation(
                "Enriched dataset must contain at least one item",
            ));
        }
        self.save_artifact(eval_run_id, ArtifactKind::EnrichedDataset, &items)
            .await
    }

    pub async fn get_enriched_dataset(
        &self,
        eval_run_id: Uuid,
    ) -> EvalPlatformResult<Vec<DatasetItem>> {
        self.get_artifact(eval_run_id, ArtifactKind::EnrichedDataset)
            .await
    }

    async fn save_artifact<T: Serialize + ?Sized>(
        &self,
        eval_run_id: Uuid,
        kind: ArtifactKind,
        payload: &T,
    ) -> EvalPlatformResult<ArtifactReference> {
        let run = self
            .storage
            .eval_runs
            .get_by_id(eval_run_id)
            .await?
            .ok_or_else(|| EvalPlatformError::not_found("EvalRun", eval_run_id))?;

        let reference = self.artifacts.resolve(&run, kind).await?;
        let bytes = serde_json::to_vec(payload)?;
        self.storage
            .blobs
            .write(&reference.container_name, &reference.blob_path, bytes)
            .await?;
        self.cache
            .invalidate(&CacheKey::new(kind.cache_prefix(), eval_run_id))
            .await;

        log_artifact_operation(
            &format!("save_{kind}"),
            &reference.container_name,
            &reference.blob_path,
            "stored",
        );
        Ok(reference)
    }

    async fn get_artifact<T>(&self, eval_run_id: Uuid, kind: ArtifactKind) -> EvalPlatformResult<T>
    where
        T: Serialize + DeserializeOwned,
    {
        let key = CacheKey::new(kind.cache_prefix(), eval_run_id);
        let ttl = match kind {
            ArtifactKind::Results => self.ttl.results(),
            ArtifactKind::EnrichedDataset => self.ttl.enriched_dataset(),
        };

        self.cache
            .get_or_load(&key, ttl, || self.load_artifact::<T>(eval_run_id, kind))
            .await?
            .ok_or_else(|| EvalPlatformError::not_found(kind.entity_name(), eval_run_id))
    }

    /// Read an artifact through the existence gate; `None` when the blob is absent
    async fn load_artifact<T: DeserializeOwned>(
        &self,
        eval_run_id: Uuid,
        kind: ArtifactKind,
    ) -> EvalPlatformResult<Option<T>> {
        let run = self
            .storage
            .eval_runs
            .get_by_id(eval_run_id)
            .await?
            .ok_or_else(|| EvalPlatformError::not_found("EvalRun", eval_run_id))?;

        let reference = self.artifacts.resolve(&run, kind).await?;
        match self
            .read_json_blob(&reference.container_name, &reference.blob_path)
            .await?
        {
            Some(value) => Ok(Some(value)),
            None => {
                debug!(
                    eval_run_id = %eval_run_id,
                    kind = %kind,
                    container = %reference.container_name,
                    blob_path = %reference.blob_path,
                    "Artifact blob not found"
                );
                Ok(None)
            }
        }
    }

    async fn read_json_blob<T: DeserializeOwned>(
        &self,
        container: &str,
        path: &str,
    ) -> EvalPlatformResult<Option<T>> {
        if !self.storage.blobs.exists(container, path).await? {
            return Ok(None);
        }
        let bytes = match self.storage.blobs.read(container, path).await {
            Ok(bytes) => bytes,
            // Removed between the existence check and the read
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let value = serde_json::from_slice(&bytes).map_err(|e| {
            EvalPlatformError::from(StorageError::Serialization(format!(
                "{container}/{path}: {e}"
            )))
        })?;
        Ok(Some(value))
    }

    // ========================================================================
    // METRICS CONFIGURATIONS
    // ========================================================================

    pub async fn create_or_update_configuration(
        &self,
        request: SaveConfigurationRequest,
        user: &str,
    ) -> EvalPlatformResult<UpsertOutcome> {
        request.validate()?;
        let key = request.key();
        let outcome = self
            .upserts
            .create_or_update(key, request.payload, acting_user(user))
            .await?;
        self.after_configuration_write(&outcome, if outcome.created { "create" } else { "update" })
            .await;
        Ok(outcome)
    }

    pub async fn update_configuration(
        &self,
        configuration_id: Uuid,
        update: ConfigurationUpdate,
        user: &str,
    ) -> EvalPlatformResult<UpsertOutcome> {
        let outcome = self
            .upserts
            .update_by_id(configuration_id, update, acting_user(user))
            .await?;
        self.after_configuration_write(&outcome, "update_by_id").await;
        Ok(outcome)
    }

    async fn after_configuration_write(&self, outcome: &UpsertOutcome, operation: &str) {
        self.cache
            .invalidate_all(&outcome.affected_cache_keys())
            .await;
        log_metadata_operation(
            operation,
            "MetricsConfiguration",
            &outcome.configuration_id().to_string(),
            &outcome.configuration.agent_id,
            Some(outcome.configuration.key().to_string().as_str()),
        );
    }

    pub async fn get_configuration(
        &self,
        configuration_id: Uuid,
    ) -> EvalPlatformResult<MetricsConfiguration> {
        let key = CacheKey::new(cache_prefixes::CONFIGURATION, configuration_id);
        self.cache
            .get_or_load(&key, self.ttl.configuration(), || async {
                self.storage
                    .configurations
                    .get_by_id(configuration_id)
                    .await
                    .map_err(EvalPlatformError::from)
            })
            .await?
            .ok_or_else(|| EvalPlatformError::not_found("MetricsConfiguration", configuration_id))
    }

    pub async fn get_configuration_by_key(
        &self,
        key: &ConfigurationKey,
    ) -> EvalPlatformResult<MetricsConfiguration> {
        if key.has_blank_part() {
            return Err(EvalPlatformError::validation(
                "Agent id, configuration name and environment name are required",
            ));
        }
        self.cache
            .get_or_load(&composite_cache_key(key), self.ttl.configuration(), || async {
                self.storage
                    .configurations
                    .get_by_key(key)
                    .await
                    .map_err(EvalPlatformError::from)
            })
            .await?
            .ok_or_else(|| EvalPlatformError::not_found("MetricsConfiguration", key))
    }

    pub async fn get_configurations_by_agent(
        &self,
        agent_id: &str,
    ) -> EvalPlatformResult<Vec<MetricsConfiguration>> {
        let agent_id = require_agent_id(agent_id)?;
        let key = CacheKey::new(cache_prefixes::CONFIGURATIONS_BY_AGENT, agent_id);
        self.cache
            .get_or_set(&key.positive(), self.ttl.configuration().positive, || async {
                self.storage
                    .configurations
                    .list_by_agent(agent_id)
                    .await
                    .map_err(EvalPlatformError::from)
            })
            .await
    }

    pub async fn delete_configuration(&self, configuration_id: Uuid) -> EvalPlatformResult<()> {
        let existing = self
            .storage
            .configurations
            .get_by_id(configuration_id)
            .await?
            .ok_or_else(|| EvalPlatformError::not_found("MetricsConfiguration", configuration_id))?;

        if !self.storage.configurations.delete(configuration_id).await? {
            return Err(EvalPlatformError::not_found(
                "MetricsConfiguration",
                configuration_id,
            ));
        }
        self.cache
            .invalidate_all(&configuration_cache_keys(&existing))
            .await;

        log_metadata_operation(
            "delete",
            "MetricsConfiguration",
            &configuration_id.to_string(),
            &existing.agent_id,
            None,
        );
        Ok(())
    }

    // ========================================================================
    // DATASETS
    // ========================================================================

    /// Store dataset items in the agent container and record their metadata
    pub async fn save_dataset(
        &self,
        request: SaveDatasetRequest,
        user: &str,
    ) -> EvalPlatformResult<DatasetMetadata> {
        request.validate()?;
        let agent_id = request.agent_id.trim().to_string();
        let dataset_id = Uuid::new_v4();
        let container_name = sanitize_container_name(&agent_id)?;
        let blob_file_path = format!("{DATASETS_ROOT}/{dataset_id}{JSON_EXTENSION}");

        let bytes = serde_json::to_vec(&request.items)?;
        self.storage
            .blobs
            .write(&container_name, &blob_file_path, bytes)
            .await?;

        let now = Utc::now();
        let metadata = DatasetMetadata {
            dataset_id,
            agent_id,
            dataset_type: request.dataset_type,
            dataset_name: request.dataset_name.trim().to_string(),
            container_name,
            blob_file_path,
            created_at: now,
            last_updated_at: now,
            last_updated_by: acting_user(user).to_string(),
        };
        self.storage.datasets.upsert(&metadata).await?;
        self.cache.invalidate_all(&dataset_cache_keys(&metadata)).await;

        log_metadata_operation(
            "create",
            "Dataset",
            &dataset_id.to_string(),
            &metadata.agent_id,
            Some(format!("{} items", request.items.len()).as_str()),
        );
        Ok(metadata)
    }

    pub async fn get_dataset_content(&self, dataset_id: Uuid) -> EvalPlatformResult<Vec<DatasetItem>> {
        let key = CacheKey::new(cache_prefixes::DATASET, dataset_id);
        self.cache
            .get_or_load(&key, self.ttl.dataset(), || {
                self.load_dataset_content(dataset_id)
            })
            .await?
            .ok_or_else(|| EvalPlatformError::not_found("Dataset", dataset_id))
    }

    async fn load_dataset_content(
        &self,
        dataset_id: Uuid,
    ) -> EvalPlatformResult<Option<Vec<DatasetItem>>> {
        match self.storage.datasets.get_by_id(dataset_id).await? {
            Some(metadata) => {
                self.read_json_blob(&metadata.container_name, &metadata.blob_file_path)
                    .await
            }
            None => Ok(None),
        }
    }

    pub async fn get_datasets_by_agent(
        &self,
        agent_id: &str,
    ) -> EvalPlatformResult<Vec<DatasetMetadata>> {
        let agent_id = require_agent_id(agent_id)?;
        let key = CacheKey::new(cache_prefixes::DATASETS_BY_AGENT, agent_id);
        self.cache
            .get_or_set(&key.positive(), self.ttl.dataset().positive, || async {
                self.storage
                    .datasets
                    .list_by_agent(agent_id)
                    .await
                    .map_err(EvalPlatformError::from)
            })
            .await
    }

    pub async fn delete_dataset(&self, dataset_id: Uuid) -> EvalPlatformResult<()> {
        let metadata = self
            .storage
            .datasets
            .get_by_id(dataset_id)
            .await?
            .ok_or_else(|| EvalPlatformError::not_found("Dataset", dataset_id))?;

        // The metadata row is gone from here on, so cached copies must go too
        // even if the blob delete below fails.
        self.storage.datasets.delete(dataset_id).await?;
        self.cache.invalidate_all(&dataset_cache_keys(&metadata)).await;
        self.storage
            .blobs
            .delete(&metadata.container_name, &metadata.blob_file_path)
            .await?;

        log_metadata_operation(
            "delete",
            "Dataset",
            &dataset_id.to_string(),
            &metadata.agent_id,
            None,
        );
        Ok(())
    }
}

fn eval_run_key(eval_run_id: Uuid) -> CacheKey {
    CacheKey::new(cache_prefixes::EVAL_RUN, eval_run_id)
}

fn dataset_cache_keys(metadata: &DatasetMetadata) -> [CacheKey; 2] {
    [
        CacheKey::new(cache_prefixes::DATASET, metadata.dataset_id),
        CacheKey::new(cache_prefixes::DATASETS_BY_AGENT, &metadata.agent_id),
    ]
}

/// Audit identity for a write; callers without one are recorded as the system
fn acting_user(user: &str) -> &str {
    let user = user.trim();
    if user.is_empty() {
        SYSTEM_USER
    } else {
        user
    }
}

fn require_agent_id(agent_id: &str) -> EvalPlatformResult<&str> {
    let trimmed = agent_id.trim();
    if trimmed.is_empty() {
        return Err(EvalPlatformError::validation("Agent id is required"));
    }
    Ok(trimmed)
}

fn ensure_same_agent(entity: &str, owner: &str, agent_id: &str) -> EvalPlatformResult<()> {
    if owner != agent_id {
        return Err(EvalPlatformError::validation(format!(
            "{entity} belongs to agent '{owner}', not '{agent_id}'"
        )));
    }
    Ok(())
}
