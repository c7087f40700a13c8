//! Create-versus-update resolution for metrics configurations
//!
//! A configuration is reachable by its generated id and by its composite key.
//! `create_or_update` resolves through the key and always lands on exactly one
//! of create or update. `update_by_id` resolves through the id and refuses to
//! move a configuration to a different agent.

use crate::constants::cache_prefixes;
use crate::cache::CacheKey;
use crate::errors::{EvalPlatformError, EvalPlatformResult};
use crate::models::{ConfigurationKey, ConfigurationPayload, MetricsConfiguration};
use crate::storage::ConfigurationStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

/// Fields an id-addressed update may change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationUpdate {
    /// When supplied, must equal the stored agent id
    #[serde(default)]
    pub agent_id: Option<String>,
    /// New name; unchanged when absent
    #[serde(default)]
    pub configuration_name: Option<String>,
    /// New environment; unchanged when absent
    #[serde(default)]
    pub environment_name: Option<String>,
    #[serde(flatten)]
    pub payload: ConfigurationPayload,
}

/// Result of a configuration write
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertOutcome {
    pub configuration: MetricsConfiguration,
    pub created: bool,
    /// Stored state before the write, for updates
    pub previous: Option<MetricsConfiguration>,
}

impl UpsertOutcome {
    pub fn configuration_id(&self) -> Uuid {
        self.configuration.configuration_id
    }

    /// Every cache key whose entry the write made stale
    pub fn affected_cache_keys(&self) -> Vec<CacheKey> {
        let mut keys = configuration_cache_keys(&self.configuration);
        if let Some(previous) = &self.previous {
            for key in configuration_cache_keys(previous) {
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }
        keys
    }
}

/// Cache keys of the read paths serving `configuration`: by id, by agent and by composite key
pub fn configuration_cache_keys(configuration: &MetricsConfiguration) -> Vec<CacheKey> {
    vec![
        CacheKey::new(cache_prefixes::CONFIGURATION, configuration.configuration_id),
        CacheKey::new(cache_prefixes::CONFIGURATIONS_BY_AGENT, &configuration.agent_id),
        composite_cache_key(&configuration.key()),
    ]
}

pub fn composite_cache_key(key: &ConfigurationKey) -> CacheKey {
    CacheKey::new(cache_prefixes::CONFIGURATION_BY_KEY, key)
}

#[derive(Clone)]
pub struct ConfigUpsertResolver {
    store: Arc<dyn ConfigurationStore>,
}

impl std::fmt::Debug for ConfigUpsertResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigUpsertResolver").finish_non_exhaustive()
    }
}

impl ConfigUpsertResolver {
    pub fn new(store: Arc<dyn ConfigurationStore>) -> Self {
        Self { store }
    }

    /// Create the configuration for `key`, or overwrite the one already stored under it
    pub async fn create_or_update(
        &self,
        key: ConfigurationKey,
        payload: ConfigurationPayload,
        user: &str,
    ) -> EvalPlatformResult<UpsertOutcome> {
        if key.has_blank_part() {
            return Err(EvalPlatformError::validation(
                "Agent id, configuration name and environment name are required",
            ));
        }
        payload.validate()?;

        let outcome = match self.store.get_by_key(&key).await? {
            Some(existing) => {
                let mut updated = existing.clone();
                updated.overwrite(payload, user);
                UpsertOutcome {
                    configuration: updated,
                    created: false,
                    previous: Some(existing),
                }
            }
            None => UpsertOutcome {
                configuration: MetricsConfiguration::create(key, payload, user),
                created: true,
                previous: None,
            },
        };

        // A concurrent creator of the same key surfaces here as a unique-key conflict
        self.store.upsert(&outcome.configuration).await?;

        info!(
            configuration_id = %outcome.configuration_id(),
            key = %outcome.configuration.key(),
            created = outcome.created,
            "Metrics configuration saved"
        );
        Ok(outcome)
    }

    /// Overwrite the configuration with `configuration_id`
    pub async fn update_by_id(
        &self,
        configuration_id: Uuid,
        update: ConfigurationUpdate,
        user: &str,
    ) -> EvalPlatformResult<UpsertOutcome> {
        update.payload.validate()?;

        let existing = self
            .store
            .get_by_id(configuration_id)
            .await?
            .ok_or_else(|| EvalPlatformError::not_found("MetricsConfiguration", configuration_id))?;

        if let Some(agent_id) = update.agent_id.as_deref().map(str::trim) {
            if agent_id != existing.agent_id {
                debug!(
                    configuration_id = %configuration_id,
                    stored_agent = %existing.agent_id,
                    requested_agent = %agent_id,
                    "Rejected cross-agent configuration update"
                );
                return Err(EvalPlatformError::validation(format!(
                    "Configuration {configuration_id} does not belong to agent '{agent_id}'"
                )));
            }
        }

        let key = ConfigurationKey::new(
            &existing.agent_id,
            update
                .configuration_name
                .as_deref()
                .unwrap_or(existing.configuration_name.as_str()),
            update
                .environment_name
                .as_deref()
                .unwrap_or(existing.environment_name.as_str()),
        );
        if key.has_blank_part() {
            return Err(EvalPlatformError::validation(
                "Configuration name and environment name cannot be blank",
            ));
        }

        let mut updated = existing.clone();
        updated.configuration_name = key.configuration_name;
        updated.environment_name = key.environment_name;
        updated.overwrite(update.payload, user);

        self.store.upsert(&updated).await?;

        info!(
            configuration_id = %configuration_id,
            key = %updated.key(),
            "Metrics configuration updated by id"
        );
        Ok(UpsertOutcome {
            configuration: updated,
            created: false,
            previous: Some(existing),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::models::MetricConfig;
    use crate::storage::InMemoryMetadataStore;

    fn payload(threshold: f64) -> ConfigurationPayload {
        ConfigurationPayload {
            description: None,
            metrics: vec![MetricConfig {
                metric_name: "relevance".to_string(),
                category_name: None,
                threshold,
            }],
        }
    }

    fn resolver() -> ConfigUpsertResolver {
        ConfigUpsertResolver::new(Arc::new(InMemoryMetadataStore::new()))
    }

    #[tokio::test]
    async fn test_create_then_update_same_id() {
        let resolver = resolver();
        let key = ConfigurationKey::new("agent1", "cfgA", "prod");

        let first = resolver
            .create_or_update(key.clone(), payload(1.0), "alice")
            .await
            .unwrap();
        assert!(first.created);

        let second = resolver
            .create_or_update(key, payload(2.0), "bob")
            .await
            .unwrap();
        assert!(!second.created);
        assert_eq!(second.configuration_id(), first.configuration_id());
        assert_eq!(second.configuration.metrics[0].threshold, 2.0);
    }

    #[tokio::test]
    async fn test_blank_key_is_validation_error() {
        let err = resolver()
            .create_or_update(ConfigurationKey::new("agent1", "", "prod"), payload(1.0), "a")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_update_by_id_missing_is_not_found() {
        let update = ConfigurationUpdate {
            agent_id: None,
            configuration_name: None,
            environment_name: None,
            payload: payload(1.0),
        };
        let err = resolver()
            .update_by_id(Uuid::new_v4(), update, "a")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_update_by_id_rejects_other_agent() {
        let resolver = resolver();
        let created = resolver
            .create_or_update(ConfigurationKey::new("agent1", "cfgA", "prod"), payload(1.0), "a")
            .await
            .unwrap();

        let update = ConfigurationUpdate {
            agent_id: Some("agent2".to_string()),
            configuration_name: None,
            environment_name: None,
            payload: payload(2.0),
        };
        let err = resolver
            .update_by_id(created.configuration_id(), update, "a")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_rename_reports_old_and_new_keys() {
        let resolver = resolver();
        let created = resolver
            .create_or_update(ConfigurationKey::new("agent1", "cfgA", "prod"), payload(1.0), "a")
            .await
            .unwrap();

        let update = ConfigurationUpdate {
            agent_id: Some("agent1".to_string()),
            configuration_name: Some("cfgB".to_string()),
            environment_name: None,
            payload: payload(2.0),
        };
        let outcome = resolver
            .update_by_id(created.configuration_id(), update, "a")
            .await
            .unwrap();

        let keys: Vec<String> = outcome
            .affected_cache_keys()
            .iter()
            .map(CacheKey::positive)
            .collect();
        assert!(keys.contains(&"metricsconfig-key:agent1|cfgA|prod".to_string()));
        assert!(keys.contains(&"metricsconfig-key:agent1|cfgB|prod".to_string()));
        assert!(keys.contains(&format!("metricsconfig:{}", created.configuration_id())));
    }

    #[tokio::test]
    async fn test_rename_onto_existing_key_conflicts() {
        let resolver = resolver();
        resolver
            .create_or_update(ConfigurationKey::new("agent1", "cfgA", "prod"), payload(1.0), "a")
            .await
            .unwrap();
        let other = resolver
            .create_or_update(ConfigurationKey::new("agent1", "cfgB", "prod"), payload(1.0), "a")
            .await
            .unwrap();

        let update = ConfigurationUpdate {
            agent_id: None,
            configuration_name: Some("cfgA".to_string()),
            environment_name: None,
            payload: payload(2.0),
        };
        let err = resolver
            .update_by_id(other.configuration_id(), update, "a")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(!err.is_retryable());
    }
}
