#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Eval Platform Core
//!
//! Request-orchestration core of an agent evaluation platform: eval-run
//! lifecycle, metrics configurations, datasets and run artifacts, served
//! through a fail-open cache-aside layer.
//!
//! ## Module Organization
//!
//! - [`orchestration`] - Use cases (`RequestOrchestrator`) and validated request types
//! - [`state_machine`] - Eval-run statuses and the terminal-status transition guard
//! - [`cache`] - Cache providers and the cache-aside engine with negative caching
//! - [`artifacts`] - Blob location resolution for results and enriched datasets
//! - [`configuration`] - Create-versus-update resolution for metrics configurations
//! - [`storage`] - Metadata and blob store traits with in-memory, filesystem and PostgreSQL backends
//! - [`models`] - Eval runs, configurations and datasets
//! - [`config`] - TOML configuration with environment overrides
//! - [`errors`] - Crate error type and its mapping to response codes
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use evalplatform_core::config::ConfigLoader;
//! use evalplatform_core::orchestration::{CreateEvalRunRequest, RequestOrchestrator};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::load_from_env()?;
//! evalplatform_core::logging::init_structured_logging(&config.logging);
//!
//! let orchestrator = RequestOrchestrator::from_config(&config).await?;
//! let run = orchestrator
//!     .create_eval_run(
//!         CreateEvalRunRequest {
//!             agent_id: "support-agent".to_string(),
//!             metrics_configuration_id: None,
//!             dataset_id: None,
//!         },
//!         "alice",
//!     )
//!     .await?;
//! println!("submitted {}", run.eval_run_id);
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test                                   # Unit and integration tests
//! cargo test --features test-services,cache-redis  # Against live PostgreSQL and Redis
//! ```

pub mod artifacts;
pub mod cache;
pub mod config;
pub mod configuration;
pub mod constants;
pub mod errors;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod state_machine;
pub mod storage;

pub use cache::{CacheAsideEngine, CacheKey, CacheProvider, CacheService, CacheTtl};
pub use config::{ConfigLoader, EvalPlatformConfig};
pub use errors::{ErrorKind, EvalPlatformError, EvalPlatformResult};
pub use models::{DatasetItem, DatasetMetadata, EvalRun, MetricsConfiguration};
pub use orchestration::RequestOrchestrator;
pub use state_machine::{EvalRunStatus, StatusTransitionGuard, TerminalStatusPolicy};
