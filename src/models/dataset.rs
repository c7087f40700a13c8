//! # Dataset Models
//!
//! Dataset metadata rows plus the JSON item shape shared by uploaded datasets
//! and enriched datasets. Producers have historically disagreed on field names,
//! so items accept the common aliases on input and always serialize camelCase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatasetType {
    Synthetic,
    Golden,
}

impl fmt::Display for DatasetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Synthetic => write!(f, "Synthetic"),
            Self::Golden => write!(f, "Golden"),
        }
    }
}

impl std::str::FromStr for DatasetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "synthetic" => Ok(Self::Synthetic),
            "golden" => Ok(Self::Golden),
            _ => Err(format!("Invalid dataset type: {s}")),
        }
    }
}

/// A single prompt/response pair
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetItem {
    #[serde(alias = "prompt", alias = "Prompt", alias = "question", alias = "Query")]
    pub query: String,
    #[serde(alias = "GroundTruth", alias = "ground_truth", alias = "expectedAnswer")]
    pub ground_truth: String,
    #[serde(
        default,
        alias = "ActualResponse",
        alias = "actual_response",
        alias = "response"
    )]
    pub actual_response: String,
    #[serde(default, alias = "ExpectedResponse", alias = "expected_response")]
    pub expected_response: Option<String>,
    #[serde(default, alias = "Context")]
    pub context: Vec<String>,
    #[serde(default, alias = "Metadata")]
    pub metadata: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetMetadata {
    pub dataset_id: Uuid,
    pub agent_id: String,
    pub dataset_type: DatasetType,
    pub dataset_name: String,
    pub container_name: String,
    pub blob_file_path: String,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
    pub last_updated_by: String,
}
