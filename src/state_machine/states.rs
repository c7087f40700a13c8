use serde::{Deserialize, Serialize};
use std::fmt;

/// Eval run status values accepted by the platform
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EvalRunStatus {
    /// Initial status when the run is submitted
    #[default]
    RequestSubmitted,
    /// The dataset is being enriched with agent responses
    EnrichingDataset,
    /// Dataset enrichment finished, waiting for the evaluation engine
    DatasetEnrichmentCompleted,
    /// The evaluation engine picked the run up
    EvalRunStarted,
    /// Evaluation finished and results were stored
    EvalRunCompleted,
    /// Evaluation failed
    EvalRunFailed,
}

impl EvalRunStatus {
    /// Every allowed status, in lifecycle order
    pub const ALL: [EvalRunStatus; 6] = [
        Self::RequestSubmitted,
        Self::EnrichingDataset,
        Self::DatasetEnrichmentCompleted,
        Self::EvalRunStarted,
        Self::EvalRunCompleted,
        Self::EvalRunFailed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RequestSubmitted => "RequestSubmitted",
            Self::EnrichingDataset => "EnrichingDataset",
            Self::DatasetEnrichmentCompleted => "DatasetEnrichmentCompleted",
            Self::EvalRunStarted => "EvalRunStarted",
            Self::EvalRunCompleted => "EvalRunCompleted",
            Self::EvalRunFailed => "EvalRunFailed",
        }
    }

    /// Allowed status names, for error messages
    pub fn allowed_names() -> Vec<String> {
        Self::ALL.iter().map(|s| s.as_str().to_string()).collect()
    }

    /// Parse a status name, ignoring ASCII case
    pub fn parse_lenient(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(trimmed))
    }
}

impl fmt::Display for EvalRunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EvalRunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_lenient(s).ok_or_else(|| format!("Invalid eval run status: {s}"))
    }
}
