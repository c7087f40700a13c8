//! # Eval Run Model
//!
//! One execution of an agent evaluation, tracked by status until it reaches a
//! terminal outcome.
//!
//! ## Storage Layout
//!
//! New runs carry a `container_name` and a folder-style `blob_file_path`
//! (`evalresults/{eval_run_id}/`). Runs created before containers were recorded
//! have neither; their artifacts live in a container derived from the agent id.
//! The artifact resolver handles both shapes.
//!
//! ## Versioning
//!
//! `version` is the optimistic-concurrency token. Stores bump it on every write
//! and refuse updates that carry a stale value.

use crate::constants::artifacts::EVAL_RESULTS_ROOT;
use crate::state_machine::EvalRunStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvalRun {
    pub eval_run_id: Uuid,
    pub agent_id: String,
    pub status: EvalRunStatus,
    pub metrics_configuration_id: Option<Uuid>,
    pub dataset_id: Option<Uuid>,
    /// Blob container holding the run's artifacts; absent on legacy runs
    pub container_name: Option<String>,
    /// Folder prefix (ending in `/`) or direct path of the results blob
    pub blob_file_path: Option<String>,
    pub started_datetime: Option<DateTime<Utc>>,
    pub completed_datetime: Option<DateTime<Utc>>,
    pub last_updated_by: String,
    pub last_updated_at: DateTime<Utc>,
    pub version: i64,
}

/// Values needed to insert a new eval run
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvalRun {
    pub agent_id: String,
    pub metrics_configuration_id: Option<Uuid>,
    pub dataset_id: Option<Uuid>,
    pub container_name: Option<String>,
    pub created_by: String,
}

impl EvalRun {
    /// Build a freshly submitted run with a new id and a folder-style blob path
    pub fn submit(new_run: NewEvalRun) -> Self {
        let eval_run_id = Uuid::new_v4();
        Self {
            eval_run_id,
            agent_id: new_run.agent_id,
            status: EvalRunStatus::RequestSubmitted,
            metrics_configuration_id: new_run.metrics_configuration_id,
            dataset_id: new_run.dataset_id,
            container_name: new_run.container_name,
            blob_file_path: Some(format!("{EVAL_RESULTS_ROOT}/{eval_run_id}/")),
            started_datetime: None,
            completed_datetime: None,
            last_updated_by: new_run.created_by,
            last_updated_at: Utc::now(),
            version: 1,
        }
    }

    /// True when `blob_file_path` names a folder rather than a file
    pub fn blob_path_is_folder(&self) -> bool {
        self.blob_file_path
            .as_deref()
            .is_some_and(|path| path.ends_with('/'))
    }

    /// Produce the next version of this run with `status` applied.
    ///
    /// `StartedDatetime` is stamped the first time the run enters
    /// `EvalRunStarted`; `CompletedDatetime` whenever it enters a terminal status.
    /// The version is left untouched; stores own the increment.
    pub fn with_status(&self, status: EvalRunStatus, terminal: bool, updated_by: &str) -> Self {
        let now = Utc::now();
        let mut next = self.clone();
        next.status = status;
        if status == EvalRunStatus::EvalRunStarted && next.started_datetime.is_none() {
            next.started_datetime = Some(now);
        }
        if terminal {
            next.completed_datetime = Some(now);
        }
        next.last_updated_by = updated_by.to_string();
        next.last_updated_at = now;
        next
    }
}
