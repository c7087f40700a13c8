//! # Storage
//!
//! Blob and metadata collaborators behind async traits, with in-memory,
//! filesystem and PostgreSQL (`postgres` feature) implementations.

pub mod errors;
pub mod filesystem;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod traits;

pub use errors::{StorageError, StorageResult};
pub use filesystem::FilesystemBlobStore;
pub use memory::{InMemoryBlobStore, InMemoryMetadataStore};
#[cfg(feature = "postgres")]
pub use postgres::PgMetadataStore;
pub use traits::{BlobStore, ConfigurationStore, DatasetStore, EvalRunStore};

use crate::config::{ConfigurationError, StorageConfig};
use std::sync::Arc;
use tracing::info;

/// Build the blob backend named by `config.blob_backend`
pub fn blob_store_from_config(config: &StorageConfig) -> Result<Arc<dyn BlobStore>, ConfigurationError> {
    match config.blob_backend.to_ascii_lowercase().as_str() {
        "memory" | "in-memory" => {
            info!(backend = "memory", "Blob store initialized");
            Ok(Arc::new(InMemoryBlobStore::new()))
        }
        "filesystem" | "fs" => {
            info!(backend = "filesystem", root = %config.blob_root.display(), "Blob store initialized");
            Ok(Arc::new(FilesystemBlobStore::new(config.blob_root.clone())))
        }
        other => Err(ConfigurationError::invalid_value(
            "storage.blob_backend",
            other,
            "expected 'memory' or 'filesystem'",
        )),
    }
}
