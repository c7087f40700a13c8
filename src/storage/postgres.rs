//! PostgreSQL metadata store
//!
//! Schema lives in `migrations/`. The composite configuration key is backed by
//! a unique index, and eval run updates are conditional on `version`.

use super::errors::{StorageError, StorageResult};
use super::traits::{ConfigurationStore, DatasetStore, EvalRunStore};
use crate::models::{
    ConfigurationKey, DatasetMetadata, DatasetType, EvalRun, MetricConfig, MetricsConfiguration,
};
use crate::state_machine::EvalRunStatus;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

#[derive(Debug, Clone)]
pub struct PgMetadataStore {
    pool: PgPool,
}

impl PgMetadataStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and apply pending migrations
    pub async fn connect(database_url: &str) -> StorageResult<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| StorageError::backend("connect to metadata database", e))?;
        MIGRATOR
            .run(&pool)
            .await
            .map_err(|e| StorageError::backend("run metadata migrations", e))?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn map_write_error(entity: &'static str, operation: &str, error: sqlx::Error) -> StorageError {
    match &error {
        sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict {
            entity,
            message: db.message().to_string(),
        },
        _ => StorageError::backend(operation, error),
    }
}

#[derive(Debug, FromRow)]
struct EvalRunRow {
    eval_run_id: Uuid,
    agent_id: String,
    status: String,
    metrics_configuration_id: Option<Uuid>,
    dataset_id: Option<Uuid>,
    container_name: Option<String>,
    blob_file_path: Option<String>,
    started_datetime: Option<DateTime<Utc>>,
    completed_datetime: Option<DateTime<Utc>>,
    last_updated_by: String,
    last_updated_at: DateTime<Utc>,
    version: i64,
}

impl TryFrom<EvalRunRow> for EvalRun {
    type Error = StorageError;

    fn try_from(row: EvalRunRow) -> StorageResult<Self> {
        let status = EvalRunStatus::parse_lenient(&row.status).ok_or_else(|| {
            StorageError::Serialization(format!(
                "eval run {} has unknown status '{}'",
                row.eval_run_id, row.status
            ))
        })?;
        Ok(EvalRun {
            eval_run_id: row.eval_run_id,
            agent_id: row.agent_id,
            status,
            metrics_configuration_id: row.metrics_configuration_id,
            dataset_id: row.dataset_id,
            container_name: row.container_name,
            blob_file_path: row.blob_file_path,
            started_datetime: row.started_datetime,
            completed_datetime: row.completed_datetime,
            last_updated_by: row.last_updated_by,
            last_updated_at: row.last_updated_at,
            version: row.version,
        })
    }
}

#[derive(Debug, FromRow)]
struct ConfigurationRow {
    configuration_id: Uuid,
    agent_id: String,
    configuration_name: String,
    environment_name: String,
    description: Option<String>,
    metrics: Json<Vec<MetricConfig>>,
    created_at: DateTime<Utc>,
    last_updated_at: DateTime<Utc>,
    last_updated_by: String,
}

impl From<ConfigurationRow> for MetricsConfiguration {
    fn from(row: ConfigurationRow) -> Self {
        MetricsConfiguration {
            configuration_id: row.configuration_id,
            agent_id: row.agent_id,
            configuration_name: row.configuration_name,
            environment_name: row.environment_name,
            description: row.description,
            metrics: row.metrics.0,
            created_at: row.created_at,
            last_updated_at: row.last_updated_at,
            last_updated_by: row.last_updated_by,
        }
    }
}

#[derive(Debug, FromRow)]
struct DatasetRow {
    dataset_id: Uuid,
    agent_id: String,
    dataset_type: String,
    dataset_name: String,
    container_name: String,
    blob_file_path: String,
    created_at: DateTime<Utc>,
    last_updated_at: DateTime<Utc>,
    last_updated_by: String,
}

impl TryFrom<DatasetRow> for DatasetMetadata {
    type Error = StorageError;

    fn try_from(row: DatasetRow) -> StorageResult<Self> {
        let dataset_type: DatasetType = row
            .dataset_type
            .parse()
            .map_err(StorageError::Serialization)?;
        Ok(DatasetMetadata {
            dataset_id: row.dataset_id,
            agent_id: row.agent_id,
            dataset_type,
            dataset_name: row.dataset_name,
            container_name: row.container_name,
            blob_file_path: row.blob_file_path,
            created_at: row.created_at,
            last_updated_at: row.last_updated_at,
            last_updated_by: row.last_updated_by,
        })
    }
}

const EVAL_RUN_COLUMNS: &str = "eval_run_id, agent_id, status, metrics_configuration_id, \
     dataset_id, container_name, blob_file_path, started_datetime, completed_datetime, \
     last_updated_by, last_updated_at, version";

const CONFIGURATION_COLUMNS: &str = "configuration_id, agent_id, configuration_name, \
     environment_name, description, metrics, created_at, last_updated_at, last_updated_by";

const DATASET_COLUMNS: &str = "dataset_id, agent_id, dataset_type, dataset_name, \
     container_name, blob_file_path, created_at, last_updated_at, last_updated_by";

#[async_trait]
impl EvalRunStore for PgMetadataStore {
    async fn insert(&self, run: &EvalRun) -> StorageResult<()> {
        sqlx::query(
            "INSERT INTO eval_runs (eval_run_id, agent_id, status, metrics_configuration_id, \
             dataset_id, container_name, blob_file_path, started_datetime, completed_datetime, \
             last_updated_by, last_updated_at, version) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(run.eval_run_id)
        .bind(&run.agent_id)
        .bind(run.status.as_str())
        .bind(run.metrics_configuration_id)
        .bind(run.dataset_id)
        .bind(&run.container_name)
        .bind(&run.blob_file_path)
        .bind(run.started_datetime)
        .bind(run.completed_datetime)
        .bind(&run.last_updated_by)
        .bind(run.last_updated_at)
        .bind(run.version)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error("EvalRun", "insert eval run", e))?;
        Ok(())
    }

    async fn get_by_id(&self, eval_run_id: Uuid) -> StorageResult<Option<EvalRun>> {
        let query = format!("SELECT {EVAL_RUN_COLUMNS} FROM eval_runs WHERE eval_run_id = $1");
        sqlx::query_as::<_, EvalRunRow>(&query)
            .bind(eval_run_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::backend("read eval run", e))?
            .map(EvalRun::try_from)
            .transpose()
    }

    async fn list_by_agent(&self, agent_id: &str) -> StorageResult<Vec<EvalRun>> {
        let query = format!(
            "SELECT {EVAL_RUN_COLUMNS} FROM eval_runs WHERE agent_id = $1 \
             ORDER BY last_updated_at DESC"
        );
        sqlx::query_as::<_, EvalRunRow>(&query)
            .bind(agent_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::backend("list eval runs", e))?
            .into_iter()
            .map(EvalRun::try_from)
            .collect()
    }

    async fn update_if_version(
        &self,
        run: &EvalRun,
        expected_version: i64,
    ) -> StorageResult<EvalRun> {
        let query = format!(
            "UPDATE eval_runs SET status = $3, metrics_configuration_id = $4, dataset_id = $5, \
             container_name = $6, blob_file_path = $7, started_datetime = $8, \
             completed_datetime = $9, last_updated_by = $10, last_updated_at = $11, \
             version = version + 1 \
             WHERE eval_run_id = $1 AND version = $2 \
             RETURNING {EVAL_RUN_COLUMNS}"
        );
        let updated = sqlx::query_as::<_, EvalRunRow>(&query)
            .bind(run.eval_run_id)
            .bind(expected_version)
            .bind(run.status.as_str())
            .bind(run.metrics_configuration_id)
            .bind(run.dataset_id)
            .bind(&run.container_name)
            .bind(&run.blob_file_path)
            .bind(run.started_datetime)
            .bind(run.completed_datetime)
            .bind(&run.last_updated_by)
            .bind(run.last_updated_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::backend("update eval run", e))?;

        match updated {
            Some(row) => EvalRun::try_from(row),
            None => {
                // Distinguish a vanished row from a lost race
                let exists: Option<(i64,)> =
                    sqlx::query_as("SELECT version FROM eval_runs WHERE eval_run_id = $1")
                        .bind(run.eval_run_id)
                        .fetch_optional(&self.pool)
                        .await
                        .map_err(|e| StorageError::backend("update eval run", e))?;
                match exists {
                    Some(_) => Err(StorageError::VersionMismatch {
                        entity: "EvalRun",
                        id: run.eval_run_id.to_string(),
                        expected: expected_version,
                    }),
                    None => Err(StorageError::not_found("EvalRun", run.eval_run_id)),
                }
            }
        }
    }
}

#[async_trait]
impl ConfigurationStore for PgMetadataStore {
    async fn get_by_id(&self, configuration_id: Uuid) -> StorageResult<Option<MetricsConfiguration>> {
        let query = format!(
            "SELECT {CONFIGURATION_COLUMNS} FROM metrics_configurations WHERE configuration_id = $1"
        );
        Ok(sqlx::query_as::<_, ConfigurationRow>(&query)
            .bind(configuration_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::backend("read metrics configuration", e))?
            .map(MetricsConfiguration::from))
    }

    async fn get_by_key(
        &self,
        key: &ConfigurationKey,
    ) -> StorageResult<Option<MetricsConfiguration>> {
        let query = format!(
            "SELECT {CONFIGURATION_COLUMNS} FROM metrics_configurations \
             WHERE agent_id = $1 AND configuration_name = $2 AND environment_name = $3"
        );
        Ok(sqlx::query_as::<_, ConfigurationRow>(&query)
            .bind(&key.agent_id)
            .bind(&key.configuration_name)
            .bind(&key.environment_name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::backend("read metrics configuration", e))?
            .map(MetricsConfiguration::from))
    }

    async fn list_by_agent(&self, agent_id: &str) -> StorageResult<Vec<MetricsConfiguration>> {
        let query = format!(
            "SELECT {CONFIGURATION_COLUMNS} FROM metrics_configurations WHERE agent_id = $1 \
             ORDER BY configuration_name, environment_name"
        );
        Ok(sqlx::query_as::<_, ConfigurationRow>(&query)
            .bind(agent_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::backend("list metrics configurations", e))?
            .into_iter()
            .map(MetricsConfiguration::from)
            .collect())
    }

    async fn upsert(&self, configuration: &MetricsConfiguration) -> StorageResult<()> {
        sqlx::query(
            "INSERT INTO metrics_configurations (configuration_id, agent_id, configuration_name, \
             environment_name, description, metrics, created_at, last_updated_at, last_updated_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (configuration_id) DO UPDATE SET \
             configuration_name = EXCLUDED.configuration_name, \
             environment_name = EXCLUDED.environment_name, \
             description = EXCLUDED.description, metrics = EXCLUDED.metrics, \
             last_updated_at = EXCLUDED.last_updated_at, \
             last_updated_by = EXCLUDED.last_updated_by",
        )
        .bind(configuration.configuration_id)
        .bind(&configuration.agent_id)
        .bind(&configuration.configuration_name)
        .bind(&configuration.environment_name)
        .bind(&configuration.description)
        .bind(Json(&configuration.metrics))
        .bind(configuration.created_at)
        .bind(configuration.last_updated_at)
        .bind(&configuration.last_updated_by)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error("MetricsConfiguration", "save metrics configuration", e))?;
        Ok(())
    }

    async fn delete(&self, configuration_id: Uuid) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM metrics_configurations WHERE configuration_id = $1")
            .bind(configuration_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::backend("delete metrics configuration", e))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl DatasetStore for PgMetadataStore {
    async fn get_by_id(&self, dataset_id: Uuid) -> StorageResult<Option<DatasetMetadata>> {
        let query = format!("SELECT {DATASET_COLUMNS} FROM datasets WHERE dataset_id = $1");
        sqlx::query_as::<_, DatasetRow>(&query)
            .bind(dataset_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::backend("read dataset", e))?
            .map(DatasetMetadata::try_from)
            .transpose()
    }

    async fn list_by_agent(&self, agent_id: &str) -> StorageResult<Vec<DatasetMetadata>> {
        let query = format!(
            "SELECT {DATASET_COLUMNS} FROM datasets WHERE agent_id = $1 \
             ORDER BY last_updated_at DESC"
        );
        sqlx::query_as::<_, DatasetRow>(&query)
            .bind(agent_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::backend("list datasets", e))?
            .into_iter()
            .map(DatasetMetadata::try_from)
            .collect()
    }

    async fn upsert(&self, dataset: &DatasetMetadata) -> StorageResult<()> {
        sqlx::query(
            "INSERT INTO datasets (dataset_id, agent_id, dataset_type, dataset_name, \
             container_name, blob_file_path, created_at, last_updated_at, last_updated_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (dataset_id) DO UPDATE SET \
             dataset_type = EXCLUDED.dataset_type, dataset_name = EXCLUDED.dataset_name, \
             container_name = EXCLUDED.container_name, blob_file_path = EXCLUDED.blob_file_path, \
             last_updated_at = EXCLUDED.last_updated_at, last_updated_by = EXCLUDED.last_updated_by",
        )
        .bind(dataset.dataset_id)
        .bind(&dataset.agent_id)
        .bind(dataset.dataset_type.to_string())
        .bind(&dataset.dataset_name)
        .bind(&dataset.container_name)
        .bind(&dataset.blob_file_path)
        .bind(dataset.created_at)
        .bind(dataset.last_updated_at)
        .bind(&dataset.last_updated_by)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error("Dataset", "save dataset", e))?;
        Ok(())
    }

    async fn delete(&self, dataset_id: Uuid) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM datasets WHERE dataset_id = $1")
            .bind(dataset_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::backend("delete dataset", e))?;
        Ok(result.rows_affected() > 0)
    }
}
