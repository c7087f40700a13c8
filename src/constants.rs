//! # Platform Constants
//!
//! Cache key namespaces, artifact naming conventions and storage layout
//! shared by the orchestrator, the cache-aside engine and the artifact resolver.

/// Cache key prefixes, one per logical entity
pub mod cache_prefixes {
    pub const EVAL_RUN: &str = "evalrun";
    pub const EVAL_RESULTS: &str = "evalresults";
    pub const ENRICHED_DATASET: &str = "enricheddataset";
    pub const CONFIGURATION: &str = "metricsconfig";
    pub const CONFIGURATIONS_BY_AGENT: &str = "metricsconfig-agent";
    pub const CONFIGURATION_BY_KEY: &str = "metricsconfig-key";
    pub const DATASET: &str = "dataset";
    pub const DATASETS_BY_AGENT: &str = "dataset-agent";
}

/// Segment inserted between prefix and id for the negative namespace
pub const NEGATIVE_CACHE_SEGMENT: &str = "NotFound";

/// Blob layout conventions
pub mod artifacts {
    /// Root folder for per-run artifacts in legacy and new-format containers
    pub const EVAL_RESULTS_ROOT: &str = "evalresults";
    /// Root folder for dataset blobs inside an agent container
    pub const DATASETS_ROOT: &str = "datasets";

    pub const RESULTS_PATTERN: &str = "evaluation_results_";
    pub const RESULTS_FALLBACK_FILE: &str = "results.json";

    pub const ENRICHED_DATASET_PATTERN: &str = "enriched_dataset";
    pub const ENRICHED_DATASET_FALLBACK_FILE: &str = "enriched_dataset.json";

    pub const JSON_EXTENSION: &str = ".json";
}

/// Azure-compatible container naming limits
pub mod container_names {
    pub const MIN_LENGTH: usize = 3;
    pub const MAX_LENGTH: usize = 63;
}

/// Identity recorded when a caller does not supply one
pub const SYSTEM_USER: &str = "system";
