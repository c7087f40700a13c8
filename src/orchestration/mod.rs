//! # Request Orchestration
//!
//! Use-case layer over storage, cache and the status guard. Controllers hand
//! validated request types to the [`RequestOrchestrator`] and map the returned
//! [`EvalPlatformError`](crate::errors::EvalPlatformError) to a response.

pub mod orchestrator;
pub mod types;

pub use orchestrator::{RequestOrchestrator, StorageBackends};
pub use types::{
    CreateEvalRunRequest, SaveConfigurationRequest, SaveDatasetRequest, UpdateStatusRequest,
};
