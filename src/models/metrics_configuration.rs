//! # Metrics Configuration Model
//!
//! Named sets of metric thresholds an agent is evaluated against in a given
//! environment.
//!
//! A configuration has two identities that must always resolve to the same
//! record:
//!
//! - `configuration_id`: generated on create, used for direct updates and deletes
//! - [`ConfigurationKey`]: `(agent_id, configuration_name, environment_name)`,
//!   unique across the store, used for idempotent create-or-update

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

/// Composite business key of a metrics configuration
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationKey {
    pub agent_id: String,
    pub configuration_name: String,
    pub environment_name: String,
}

impl ConfigurationKey {
    /// Build a key, trimming surrounding whitespace from every part
    pub fn new(
        agent_id: impl AsRef<str>,
        configuration_name: impl AsRef<str>,
        environment_name: impl AsRef<str>,
    ) -> Self {
        Self {
            agent_id: agent_id.as_ref().trim().to_string(),
            configuration_name: configuration_name.as_ref().trim().to_string(),
            environment_name: environment_name.as_ref().trim().to_string(),
        }
    }

    /// Whether any component is blank
    pub fn has_blank_part(&self) -> bool {
        self.agent_id.is_empty()
            || self.configuration_name.is_empty()
            || self.environment_name.is_empty()
    }
}

impl fmt::Display for ConfigurationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}",
            self.agent_id, self.configuration_name, self.environment_name
        )
    }
}

/// Threshold for a single metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MetricConfig {
    #[validate(length(min = 1, max = 128))]
    pub metric_name: String,
    pub category_name: Option<String>,
    #[validate(range(min = 0.0, max = 100.0))]
    pub threshold: f64,
}

/// Mutable fields of a configuration, supplied on create and update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationPayload {
    #[validate(length(max = 1024))]
    pub description: Option<String>,
    #[validate(length(min = 1), nested)]
    pub metrics: Vec<MetricConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsConfiguration {
    pub configuration_id: Uuid,
    pub agent_id: String,
    pub configuration_name: String,
    pub environment_name: String,
    pub description: Option<String>,
    pub metrics: Vec<MetricConfig>,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
    pub last_updated_by: String,
}

impl MetricsConfiguration {
    /// New configuration with a freshly generated id
    pub fn create(key: ConfigurationKey, payload: ConfigurationPayload, created_by: &str) -> Self {
        let now = Utc::now();
        Self {
            configuration_id: Uuid::new_v4(),
            agent_id: key.agent_id,
            configuration_name: key.configuration_name,
            environment_name: key.environment_name,
            description: payload.description,
            metrics: payload.metrics,
            created_at: now,
            last_updated_at: now,
            last_updated_by: created_by.to_string(),
        }
    }

    pub fn key(&self) -> ConfigurationKey {
        ConfigurationKey {
            agent_id: self.agent_id.clone(),
            configuration_name: self.configuration_name.clone(),
            environment_name: self.environment_name.clone(),
        }
    }

    /// Overwrite the mutable fields, keeping id, agent and creation time
    pub fn overwrite(&mut self, payload: ConfigurationPayload, updated_by: &str) {
        self.description = payload.description;
        self.metrics = payload.metrics;
        self.last_updated_at = Utc::now();
        self.last_updated_by = updated_by.to_string();
    }
}
