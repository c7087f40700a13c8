//! # Run Artifacts
//!
//! JSON blobs attached to an eval run (results, enriched dataset) and the
//! rules for locating them.

pub mod naming;
pub mod resolver;

pub use naming::{legacy_container_name, sanitize_container_name};
pub use resolver::ArtifactLocationResolver;

use crate::constants::artifacts::{
    ENRICHED_DATASET_FALLBACK_FILE, ENRICHED_DATASET_PATTERN, EVAL_RESULTS_ROOT, JSON_EXTENSION,
    RESULTS_FALLBACK_FILE, RESULTS_PATTERN,
};
use crate::constants::cache_prefixes;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactKind {
    Results,
    EnrichedDataset,
}

impl ArtifactKind {
    /// Substring a matching blob file name contains
    pub fn pattern(&self) -> &'static str {
        match self {
            Self::Results => RESULTS_PATTERN,
            Self::EnrichedDataset => ENRICHED_DATASET_PATTERN,
        }
    }

    /// File name used inside a run folder when no blob matches the pattern
    pub fn fallback_file(&self) -> &'static str {
        match self {
            Self::Results => RESULTS_FALLBACK_FILE,
            Self::EnrichedDataset => ENRICHED_DATASET_FALLBACK_FILE,
        }
    }

    /// Whether a run's non-folder `blob_file_path` points at this artifact
    pub fn accepts_direct_path(&self) -> bool {
        matches!(self, Self::Results)
    }

    /// `evalresults/{eval_run_id}/{fallback_file}`
    pub fn default_path(&self, eval_run_id: Uuid) -> String {
        format!("{EVAL_RESULTS_ROOT}/{eval_run_id}/{}", self.fallback_file())
    }

    pub fn matches(&self, file_name: &str) -> bool {
        file_name.contains(self.pattern()) && file_name.ends_with(JSON_EXTENSION)
    }

    pub(crate) fn cache_prefix(&self) -> &'static str {
        match self {
            Self::Results => cache_prefixes::EVAL_RESULTS,
            Self::EnrichedDataset => cache_prefixes::ENRICHED_DATASET,
        }
    }

    pub(crate) fn entity_name(&self) -> &'static str {
        match self {
            Self::Results => "EvalResults",
            Self::EnrichedDataset => "EnrichedDataset",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Results => write!(f, "results"),
            Self::EnrichedDataset => write!(f, "enriched_dataset"),
        }
    }
}

/// Where an artifact blob lives; derived per request, never persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactReference {
    pub container_name: String,
    pub blob_path: String,
}

impl ArtifactReference {
    pub fn new(container_name: impl Into<String>, blob_path: impl Into<String>) -> Self {
        Self {
            container_name: container_name.into(),
            blob_path: blob_path.into(),
        }
    }
}
