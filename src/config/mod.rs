//! # Evaluation Platform Configuration
//!
//! Typed configuration tree loaded from TOML by [`ConfigLoader`], with
//! declarative `validator` rules and defaults that match
//! `config/evalplatform/base.toml`.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use evalplatform_core::config::ConfigLoader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::load_from_env()?;
//! let eval_run_ttl = config.cache.ttl.eval_run();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use crate::cache::CacheTtl;
use crate::state_machine::TerminalStatusPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use validator::{Validate, ValidationError};

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigLoader;

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "snake_case")]
pub struct EvalPlatformConfig {
    #[validate(nested)]
    pub cache: CacheConfig,

    pub status: StatusConfig,

    #[validate(nested)]
    pub storage: StorageConfig,

    #[validate(nested)]
    pub logging: LoggingConfig,
}

// ============================================================================
// CACHE
// ============================================================================

/// Cache backend selection and TTLs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "snake_case")]
pub struct CacheConfig {
    /// When false every lookup goes to storage
    pub enabled: bool,

    /// "memory" | "in-memory" | "redis" | "noop"
    #[validate(length(min = 1))]
    pub backend: String,

    /// Capacity bound of the in-memory backend
    #[validate(range(min = 1, max = 10_000_000))]
    pub max_entries: usize,

    #[validate(nested)]
    pub ttl: CacheTtlConfig,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub redis: Option<RedisConfig>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: "memory".to_string(),
            max_entries: 10_000,
            ttl: CacheTtlConfig::default(),
            redis: None,
        }
    }
}

/// Redis connection settings (feature `cache-redis`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct RedisConfig {
    #[validate(length(min = 1))]
    pub url: String,
}

/// Positive and negative TTLs per cached entity, in seconds
///
/// Negative entries must never outlive positive ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "snake_case")]
#[validate(schema(function = "validate_negative_ttls"))]
pub struct CacheTtlConfig {
    #[validate(range(min = 1))]
    pub eval_run_seconds: u64,
    #[validate(range(min = 1))]
    pub eval_run_not_found_seconds: u64,

    #[validate(range(min = 1))]
    pub results_seconds: u64,
    #[validate(range(min = 1))]
    pub results_not_found_seconds: u64,

    #[validate(range(min = 1))]
    pub enriched_dataset_seconds: u64,
    #[validate(range(min = 1))]
    pub enriched_dataset_not_found_seconds: u64,

    #[validate(range(min = 1))]
    pub configuration_seconds: u64,
    #[validate(range(min = 1))]
    pub configuration_not_found_seconds: u64,

    #[validate(range(min = 1))]
    pub dataset_seconds: u64,
    #[validate(range(min = 1))]
    pub dataset_not_found_seconds: u64,
}

impl Default for CacheTtlConfig {
    fn default() -> Self {
        const MINUTE: u64 = 60;
        Self {
            eval_run_seconds: 30 * MINUTE,
            eval_run_not_found_seconds: 5 * MINUTE,
            results_seconds: 60 * MINUTE,
            results_not_found_seconds: 10 * MINUTE,
            enriched_dataset_seconds: 60 * MINUTE,
            enriched_dataset_not_found_seconds: 10 * MINUTE,
            configuration_seconds: 30 * MINUTE,
            configuration_not_found_seconds: 5 * MINUTE,
            dataset_seconds: 15 * MINUTE,
            dataset_not_found_seconds: 5 * MINUTE,
        }
    }
}

impl CacheTtlConfig {
    pub fn eval_run(&self) -> CacheTtl {
        CacheTtl::from_secs(self.eval_run_seconds, self.eval_run_not_found_seconds)
    }

    pub fn results(&self) -> CacheTtl {
        CacheTtl::from_secs(self.results_seconds, self.results_not_found_seconds)
    }

    pub fn enriched_dataset(&self) -> CacheTtl {
        CacheTtl::from_secs(
            self.enriched_dataset_seconds,
            self.enriched_dataset_not_found_seconds,
        )
    }

    pub fn configuration(&self) -> CacheTtl {
        CacheTtl::from_secs(
            self.configuration_seconds,
            self.configuration_not_found_seconds,
        )
    }

    pub fn dataset(&self) -> CacheTtl {
        CacheTtl::from_secs(self.dataset_seconds, self.dataset_not_found_seconds)
    }

    fn pairs(&self) -> [(&'static str, CacheTtl); 5] {
        [
            ("eval_run", self.eval_run()),
            ("results", self.results()),
            ("enriched_dataset", self.enriched_dataset()),
            ("configuration", self.configuration()),
            ("dataset", self.dataset()),
        ]
    }
}

fn validate_negative_ttls(ttl: &CacheTtlConfig) -> Result<(), ValidationError> {
    for (name, pair) in ttl.pairs() {
        if pair.negative > pair.positive {
            let mut error = ValidationError::new("negative_ttl_exceeds_positive");
            error.message = Some(
                format!("{name}: not-found TTL must not exceed the positive TTL").into(),
            );
            return Err(error);
        }
    }
    Ok(())
}

// ============================================================================
// STATUS
// ============================================================================

/// Eval run status handling
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct StatusConfig {
    /// Which statuses freeze a run
    pub terminal_policy: TerminalStatusPolicy,
}

// ============================================================================
// STORAGE
// ============================================================================

/// Blob and metadata storage settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "snake_case")]
pub struct StorageConfig {
    /// "memory" | "filesystem"
    #[validate(length(min = 1))]
    pub blob_backend: String,

    /// Root directory of the filesystem blob backend
    pub blob_root: PathBuf,

    /// PostgreSQL URL for the metadata store; in-memory metadata when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            blob_backend: "memory".to_string(),
            blob_root: PathBuf::from("data/blobs"),
            database_url: None,
        }
    }
}

// ============================================================================
// LOGGING
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Log output settings; `RUST_LOG` overrides `level` when set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "snake_case")]
pub struct LoggingConfig {
    #[validate(length(min = 1))]
    pub level: String,

    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}
