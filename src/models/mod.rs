pub mod dataset;
pub mod eval_run;
pub mod metrics_configuration;

// Re-export core models for easy access
pub use dataset::{DatasetItem, DatasetMetadata, DatasetType};
pub use eval_run::{EvalRun, NewEvalRun};
pub use metrics_configuration::{
    ConfigurationKey, ConfigurationPayload, MetricConfig, MetricsConfiguration,
};
