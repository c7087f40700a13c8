//! Request and fixture builders shared by the integration tests
#![allow(dead_code)]

use evalplatform_core::cache::providers::InMemoryCacheService;
use evalplatform_core::cache::CacheService;
use evalplatform_core::models::{ConfigurationPayload, DatasetItem, DatasetType, MetricConfig};
use evalplatform_core::orchestration::{
    CreateEvalRunRequest, RequestOrchestrator, SaveConfigurationRequest, SaveDatasetRequest,
    StorageBackends,
};
use evalplatform_core::EvalPlatformConfig;

pub const TEST_USER: &str = "test-user";

pub fn orchestrator() -> RequestOrchestrator<InMemoryCacheService> {
    orchestrator_with(StorageBackends::in_memory(), InMemoryCacheService::new(1000))
}

pub fn orchestrator_with<C: CacheService>(
    storage: StorageBackends,
    cache: C,
) -> RequestOrchestrator<C> {
    RequestOrchestrator::new(storage, cache, &EvalPlatformConfig::default())
}

pub fn create_run_request(agent_id: &str) -> CreateEvalRunRequest {
    CreateEvalRunRequest {
        agent_id: agent_id.to_string(),
        metrics_configuration_id: None,
        dataset_id: None,
    }
}

pub fn payload(threshold: f64) -> ConfigurationPayload {
    ConfigurationPayload {
        description: Some("quality gates".to_string()),
        metrics: vec![
            MetricConfig {
                metric_name: "groundedness".to_string(),
                category_name: Some("quality".to_string()),
                threshold,
            },
            MetricConfig {
                metric_name: "relevance".to_string(),
                category_name: Some("quality".to_string()),
                threshold,
            },
        ],
    }
}

pub fn save_configuration_request(
    agent_id: &str,
    configuration_name: &str,
    environment_name: &str,
    threshold: f64,
) -> SaveConfigurationRequest {
    SaveConfigurationRequest {
        agent_id: agent_id.to_string(),
        configuration_name: configuration_name.to_string(),
        environment_name: environment_name.to_string(),
        payload: payload(threshold),
    }
}

pub fn dataset_items(count: usize) -> Vec<DatasetItem> {
    (0..count)
        .map(|i| DatasetItem {
            query: format!("question {i}"),
            ground_truth: format!("answer {i}"),
            ..Default::default()
        })
        .collect()
}

pub fn save_dataset_request(agent_id: &str, count: usize) -> SaveDatasetRequest {
    SaveDatasetRequest {
        agent_id: agent_id.to_string(),
        dataset_type: DatasetType::Golden,
        dataset_name: "golden questions".to_string(),
        items: dataset_items(count),
    }
}
