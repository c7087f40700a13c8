//! # Orchestration Types
//!
//! Validated request shapes accepted by the [`RequestOrchestrator`](super::RequestOrchestrator).
//! Controllers deserialize into these and the orchestrator runs `validate()`
//! before touching storage.

use crate::models::{ConfigurationKey, ConfigurationPayload, DatasetItem, DatasetType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Submit a new eval run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEvalRunRequest {
    #[validate(length(max = 256), custom(function = "not_blank"))]
    pub agent_id: String,
    #[serde(default)]
    pub metrics_configuration_id: Option<Uuid>,
    #[serde(default)]
    pub dataset_id: Option<Uuid>,
}

/// Move an eval run to a new status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub eval_run_id: Uuid,
    /// Raw status name; parsed case-insensitively by the guard
    #[validate(length(max = 64))]
    pub status: String,
    /// Version the caller last read; the update is refused if it moved on
    #[serde(default)]
    pub expected_version: Option<i64>,
}

/// Create a configuration or overwrite the one with the same composite key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SaveConfigurationRequest {
    #[validate(length(max = 256), custom(function = "not_blank"))]
    pub agent_id: String,
    #[validate(length(max = 256), custom(function = "not_blank"))]
    pub configuration_name: String,
    #[validate(length(max = 128), custom(function = "not_blank"))]
    pub environment_name: String,
    #[serde(flatten)]
    #[validate(nested)]
    pub payload: ConfigurationPayload,
}

impl SaveConfigurationRequest {
    pub fn key(&self) -> ConfigurationKey {
        ConfigurationKey::new(
            &self.agent_id,
            &self.configuration_name,
            &self.environment_name,
        )
    }
}

/// Upload a dataset for an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SaveDatasetRequest {
    #[validate(length(max = 256), custom(function = "not_blank"))]
    pub agent_id: String,
    pub dataset_type: DatasetType,
    #[validate(length(max = 256), custom(function = "not_blank"))]
    pub dataset_name: String,
    #[validate(length(min = 1))]
    pub items: Vec<DatasetItem>,
}
