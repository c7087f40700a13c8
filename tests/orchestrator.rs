//! End-to-end use cases against in-memory storage

mod common;

use common::*;
use evalplatform_core::cache::providers::InMemoryCacheService;
use evalplatform_core::configuration::ConfigurationUpdate;
use evalplatform_core::models::{ConfigurationKey, EvalRun, NewEvalRun};
use evalplatform_core::orchestration::{RequestOrchestrator, StorageBackends, UpdateStatusRequest};
use evalplatform_core::storage::{BlobStore, EvalRunStore, InMemoryBlobStore, InMemoryMetadataStore};
use evalplatform_core::ErrorKind;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

struct Harness {
    orchestrator: RequestOrchestrator<InMemoryCacheService>,
    metadata: Arc<InMemoryMetadataStore>,
    blobs: Arc<InMemoryBlobStore>,
}

fn harness() -> Harness {
    let metadata = Arc::new(InMemoryMetadataStore::new());
    let blobs = Arc::new(InMemoryBlobStore::new());
    let backends = StorageBackends::with_metadata_store(metadata.clone(), blobs.clone());
    Harness {
        orchestrator: orchestrator_with(backends, InMemoryCacheService::new(1000)),
        metadata,
        blobs,
    }
}

// ============================================================================
// EVAL RUNS
// ============================================================================

#[tokio::test]
async fn test_create_run_with_owned_configuration_and_dataset() {
    let orchestrator = orchestrator();
    let configuration = orchestrator
        .create_or_update_configuration(save_configuration_request("agent1", "cfgA", "prod", 3.0), TEST_USER)
        .await
        .unwrap();
    let dataset = orchestrator
        .save_dataset(save_dataset_request("agent1", 2), TEST_USER)
        .await
        .unwrap();

    let mut request = create_run_request("agent1");
    request.metrics_configuration_id = Some(configuration.configuration_id());
    request.dataset_id = Some(dataset.dataset_id);
    let run = orchestrator.create_eval_run(request, TEST_USER).await.unwrap();

    let resolved = orchestrator
        .get_metrics_configuration_for_run(run.eval_run_id)
        .await
        .unwrap();
    assert_eq!(resolved.configuration_id, configuration.configuration_id());
    assert_eq!(resolved.metrics.len(), 2);
}

#[tokio::test]
async fn test_create_run_rejects_other_agents_configuration() {
    let orchestrator = orchestrator();
    let configuration = orchestrator
        .create_or_update_configuration(save_configuration_request("agent1", "cfgA", "prod", 3.0), TEST_USER)
        .await
        .unwrap();

    let mut request = create_run_request("agent2");
    request.metrics_configuration_id = Some(configuration.configuration_id());
    let err = orchestrator.create_eval_run(request, TEST_USER).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_run_without_configuration_has_none_to_resolve() {
    let orchestrator = orchestrator();
    let run = orchestrator
        .create_eval_run(create_run_request("agent1"), TEST_USER)
        .await
        .unwrap();

    let err = orchestrator
        .get_metrics_configuration_for_run(run.eval_run_id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_runs_listed_by_agent() {
    let orchestrator = orchestrator();
    for agent in ["agent1", "agent1", "agent2"] {
        orchestrator
            .create_eval_run(create_run_request(agent), TEST_USER)
            .await
            .unwrap();
    }

    assert_eq!(orchestrator.get_eval_runs_by_agent("agent1").await.unwrap().len(), 2);
    assert_eq!(orchestrator.get_eval_runs_by_agent("agent2").await.unwrap().len(), 1);
    assert!(orchestrator.get_eval_runs_by_agent("agent3").await.unwrap().is_empty());

    let err = orchestrator.get_eval_runs_by_agent(" ").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_concurrent_status_updates_do_not_both_win() {
    let orchestrator = orchestrator();
    let run = orchestrator
        .create_eval_run(create_run_request("agent1"), TEST_USER)
        .await
        .unwrap();

    let request = |status: &str| UpdateStatusRequest {
        eval_run_id: run.eval_run_id,
        status: status.to_string(),
        expected_version: Some(run.version),
    };
    let (first, second) = tokio::join!(
        orchestrator.update_status(request("EnrichingDataset"), "runner-a"),
        orchestrator.update_status(request("EvalRunStarted"), "runner-b"),
    );

    let outcomes = [first, second];
    let winners = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);

    let loser = outcomes.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert_eq!(loser.kind(), ErrorKind::Conflict);
    assert!(loser.is_retryable());

    let stored = orchestrator.get_eval_run(run.eval_run_id).await.unwrap();
    assert_eq!(stored.version, run.version + 1);
}

#[tokio::test]
async fn test_stale_version_on_finished_run_reports_terminal_state() {
    let orchestrator = orchestrator();
    let run = orchestrator
        .create_eval_run(create_run_request("agent1"), TEST_USER)
        .await
        .unwrap();
    orchestrator
        .update_status(
            UpdateStatusRequest {
                eval_run_id: run.eval_run_id,
                status: "EvalRunCompleted".to_string(),
                expected_version: Some(run.version),
            },
            "runner-a",
        )
        .await
        .unwrap();

    // The second runner still holds the version it read before completion
    let err = orchestrator
        .update_status(
            UpdateStatusRequest {
                eval_run_id: run.eval_run_id,
                status: "EvalRunFailed".to_string(),
                expected_version: Some(run.version),
            },
            "runner-b",
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TerminalStateViolation);
    assert!(!err.is_retryable());
}

// ============================================================================
// RESULTS AND ENRICHED DATASETS
// ============================================================================

#[tokio::test]
async fn test_results_negative_cache_cleared_by_save() {
    let orchestrator = orchestrator();
    let run = orchestrator
        .create_eval_run(create_run_request("agent1"), TEST_USER)
        .await
        .unwrap();

    for _ in 0..2 {
        let err = orchestrator.get_results(run.eval_run_id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    let results = json!({ "metrics": [{ "name": "groundedness", "score": 4.2 }] });
    let reference = orchestrator.save_results(run.eval_run_id, &results).await.unwrap();
    assert_eq!(
        reference.blob_path,
        format!("evalresults/{}/results.json", run.eval_run_id)
    );

    assert_eq!(orchestrator.get_results(run.eval_run_id).await.unwrap(), results);
}

#[tokio::test]
async fn test_results_found_by_pattern_in_run_folder() {
    let h = harness();
    let run = h
        .orchestrator
        .create_eval_run(create_run_request("Agent One"), TEST_USER)
        .await
        .unwrap();

    let path = format!("evalresults/{}/evaluation_results_20250101.json", run.eval_run_id);
    h.blobs
        .write("agentone", &path, br#"{"score": 5}"#.to_vec())
        .await
        .unwrap();

    assert_eq!(
        h.orchestrator.get_results(run.eval_run_id).await.unwrap(),
        json!({ "score": 5 })
    );
}

#[tokio::test]
async fn test_legacy_run_reads_from_agent_container() {
    let h = harness();
    let legacy = EvalRun {
        container_name: None,
        blob_file_path: None,
        ..EvalRun::submit(NewEvalRun {
            agent_id: "Legacy Agent".to_string(),
            metrics_configuration_id: None,
            dataset_id: None,
            container_name: None,
            created_by: TEST_USER.to_string(),
        })
    };
    EvalRunStore::insert(&*h.metadata, &legacy).await.unwrap();

    let path = format!("evalresults/{}/results.json", legacy.eval_run_id);
    h.blobs
        .write("LegacyAgent", &path, br#"[1, 2, 3]"#.to_vec())
        .await
        .unwrap();

    assert_eq!(
        h.orchestrator.get_results(legacy.eval_run_id).await.unwrap(),
        json!([1, 2, 3])
    );
}

#[tokio::test]
async fn test_corrupt_results_blob_is_storage_error() {
    let h = harness();
    let run = h
        .orchestrator
        .create_eval_run(create_run_request("agent1"), TEST_USER)
        .await
        .unwrap();
    let path = format!("evalresults/{}/results.json", run.eval_run_id);
    h.blobs.write("agent1", &path, b"not json".to_vec()).await.unwrap();

    let err = h.orchestrator.get_results(run.eval_run_id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);
    assert!(!err.public_message().contains("not json"));
}

#[tokio::test]
async fn test_results_must_be_json_document() {
    let orchestrator = orchestrator();
    let run = orchestrator
        .create_eval_run(create_run_request("agent1"), TEST_USER)
        .await
        .unwrap();

    let err = orchestrator
        .save_results(run.eval_run_id, &json!("just a string"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_results_for_missing_run_is_not_found() {
    let err = orchestrator()
        .save_results(Uuid::new_v4(), &json!({}))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_enriched_dataset_round_trip() {
    let orchestrator = orchestrator();
    let run = orchestrator
        .create_eval_run(create_run_request("agent1"), TEST_USER)
        .await
        .unwrap();

    let err = orchestrator.get_enriched_dataset(run.eval_run_id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let items = dataset_items(3);
    let reference = orchestrator
        .save_enriched_dataset(run.eval_run_id, &items)
        .await
        .unwrap();
    assert!(reference.blob_path.ends_with("enriched_dataset.json"));

    assert_eq!(orchestrator.get_enriched_dataset(run.eval_run_id).await.unwrap(), items);
}

#[tokio::test]
async fn test_blob_outage_surfaces_as_storage_error() {
    let backends = StorageBackends::with_metadata_store(
        Arc::new(InMemoryMetadataStore::new()),
        Arc::new(FailingBlobStore),
    );
    let orchestrator = orchestrator_with(backends, InMemoryCacheService::new(100));
    let run = orchestrator
        .create_eval_run(create_run_request("agent1"), TEST_USER)
        .await
        .unwrap();

    let err = orchestrator
        .save_results(run.eval_run_id, &json!({ "score": 1 }))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);
    assert_eq!(err.kind().status_code(), 500);
    assert!(!err.public_message().contains("blob service unavailable"));
}

// ============================================================================
// METRICS CONFIGURATIONS
// ============================================================================

#[tokio::test]
async fn test_save_same_key_updates_and_refreshes_every_read_path() {
    let orchestrator = orchestrator();
    let created = orchestrator
        .create_or_update_configuration(save_configuration_request("agent1", "cfgA", "prod", 3.0), TEST_USER)
        .await
        .unwrap();
    assert!(created.created);

    let key = ConfigurationKey::new("agent1", "cfgA", "prod");
    // Warm every cached read path
    orchestrator.get_configuration(created.configuration_id()).await.unwrap();
    orchestrator.get_configuration_by_key(&key).await.unwrap();
    orchestrator.get_configurations_by_agent("agent1").await.unwrap();

    let updated = orchestrator
        .create_or_update_configuration(save_configuration_request("agent1", "cfgA", "prod", 4.5), TEST_USER)
        .await
        .unwrap();
    assert!(!updated.created);
    assert_eq!(updated.configuration_id(), created.configuration_id());

    let by_id = orchestrator.get_configuration(created.configuration_id()).await.unwrap();
    let by_key = orchestrator.get_configuration_by_key(&key).await.unwrap();
    let by_agent = orchestrator.get_configurations_by_agent("agent1").await.unwrap();
    assert_eq!(by_id.metrics[0].threshold, 4.5);
    assert_eq!(by_key.metrics[0].threshold, 4.5);
    assert_eq!(by_agent.len(), 1);
    assert_eq!(by_agent[0].metrics[0].threshold, 4.5);
}

#[tokio::test]
async fn test_missing_key_marker_cleared_by_create() {
    let orchestrator = orchestrator();
    let key = ConfigurationKey::new("agent1", "cfgA", "prod");

    let err = orchestrator.get_configuration_by_key(&key).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    orchestrator
        .create_or_update_configuration(save_configuration_request("agent1", "cfgA", "prod", 3.0), TEST_USER)
        .await
        .unwrap();

    let found = orchestrator.get_configuration_by_key(&key).await.unwrap();
    assert_eq!(found.configuration_name, "cfgA");
}

#[tokio::test]
async fn test_rename_invalidates_old_and_new_keys() {
    let orchestrator = orchestrator();
    let created = orchestrator
        .create_or_update_configuration(save_configuration_request("agent1", "cfgA", "prod", 3.0), TEST_USER)
        .await
        .unwrap();
    let old_key = ConfigurationKey::new("agent1", "cfgA", "prod");
    let new_key = ConfigurationKey::new("agent1", "cfgB", "prod");

    orchestrator.get_configuration_by_key(&old_key).await.unwrap();
    // Negative marker for the target name
    assert!(orchestrator.get_configuration_by_key(&new_key).await.is_err());

    orchestrator
        .update_configuration(
            created.configuration_id(),
            ConfigurationUpdate {
                agent_id: Some("agent1".to_string()),
                configuration_name: Some("cfgB".to_string()),
                environment_name: None,
                payload: payload(3.5),
            },
            TEST_USER,
        )
        .await
        .unwrap();

    let err = orchestrator.get_configuration_by_key(&old_key).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let renamed = orchestrator.get_configuration_by_key(&new_key).await.unwrap();
    assert_eq!(renamed.configuration_id, created.configuration_id());
}

#[tokio::test]
async fn test_delete_configuration_clears_cached_reads() {
    let orchestrator = orchestrator();
    let created = orchestrator
        .create_or_update_configuration(save_configuration_request("agent1", "cfgA", "prod", 3.0), TEST_USER)
        .await
        .unwrap();
    orchestrator.get_configuration(created.configuration_id()).await.unwrap();
    orchestrator.get_configurations_by_agent("agent1").await.unwrap();

    orchestrator
        .delete_configuration(created.configuration_id())
        .await
        .unwrap();

    let err = orchestrator
        .get_configuration(created.configuration_id())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(orchestrator.get_configurations_by_agent("agent1").await.unwrap().is_empty());

    let again = orchestrator
        .delete_configuration(created.configuration_id())
        .await
        .unwrap_err();
    assert_eq!(again.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_invalid_configuration_request_is_rejected() {
    let orchestrator = orchestrator();
    let blank = save_configuration_request("agent1", "  ", "prod", 3.0);
    let err = orchestrator
        .create_or_update_configuration(blank, TEST_USER)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.kind().status_code(), 400);
}

// ============================================================================
// DATASETS
// ============================================================================

#[tokio::test]
async fn test_dataset_lifecycle() {
    let h = harness();
    let metadata = h
        .orchestrator
        .save_dataset(save_dataset_request("Agent One", 4), TEST_USER)
        .await
        .unwrap();
    assert_eq!(metadata.container_name, "agentone");
    assert_eq!(
        metadata.blob_file_path,
        format!("datasets/{}.json", metadata.dataset_id)
    );
    assert!(h
        .blobs
        .exists("agentone", &metadata.blob_file_path)
        .await
        .unwrap());

    let listed = h.orchestrator.get_datasets_by_agent("Agent One").await.unwrap();
    assert_eq!(listed.len(), 1);

    let items = h
        .orchestrator
        .get_dataset_content(metadata.dataset_id)
        .await
        .unwrap();
    assert_eq!(items, dataset_items(4));

    h.orchestrator.delete_dataset(metadata.dataset_id).await.unwrap();

    let err = h
        .orchestrator
        .get_dataset_content(metadata.dataset_id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(h.orchestrator.get_datasets_by_agent("Agent One").await.unwrap().is_empty());
    assert!(!h
        .blobs
        .exists("agentone", &metadata.blob_file_path)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_failed_blob_delete_still_clears_cached_dataset() {
    let metadata = Arc::new(InMemoryMetadataStore::new());
    let blobs = Arc::new(UndeletableBlobStore::default());
    let backends = StorageBackends::with_metadata_store(metadata, blobs.clone());
    let orchestrator = orchestrator_with(backends, InMemoryCacheService::new(1000));

    let dataset = orchestrator
        .save_dataset(save_dataset_request("agent1", 3), TEST_USER)
        .await
        .unwrap();
    assert_eq!(
        orchestrator.get_dataset_content(dataset.dataset_id).await.unwrap(),
        dataset_items(3)
    );
    assert_eq!(orchestrator.get_datasets_by_agent("agent1").await.unwrap().len(), 1);

    let err = orchestrator.delete_dataset(dataset.dataset_id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);
    assert_eq!(blobs.blob_count(&dataset.container_name), 1);

    let err = orchestrator
        .get_dataset_content(dataset.dataset_id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(orchestrator.get_datasets_by_agent("agent1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_dataset_list_refreshed_after_save() {
    let orchestrator = orchestrator();
    assert!(orchestrator.get_datasets_by_agent("agent1").await.unwrap().is_empty());

    orchestrator
        .save_dataset(save_dataset_request("agent1", 1), TEST_USER)
        .await
        .unwrap();

    assert_eq!(orchestrator.get_datasets_by_agent("agent1").await.unwrap().len(), 1);
}
