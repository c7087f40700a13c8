//! Storage error types
//!
//! Backend failures carry the raw driver message for the log. Conversion into
//! [`EvalPlatformError`] logs it and keeps only the operation name for callers.

use crate::errors::EvalPlatformError;
use crate::logging::log_storage_error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    /// Addressed blob or record does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Unique constraint rejected the write
    #[error("Conflict on {entity}: {message}")]
    Conflict {
        entity: &'static str,
        message: String,
    },

    /// Conditional write lost against a concurrent writer
    #[error("Version mismatch for {entity} {id}: expected {expected}")]
    VersionMismatch {
        entity: &'static str,
        id: String,
        expected: i64,
    },

    /// Network, I/O, driver or auth failure
    #[error("Storage backend error during {operation}: {message}")]
    Backend { operation: String, message: String },

    /// Stored bytes could not be (de)serialized
    #[error("Storage serialization error: {0}")]
    Serialization(String),
}

impl StorageError {
    pub fn backend(operation: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self::Backend {
            operation: operation.into(),
            message: error.to_string(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<StorageError> for EvalPlatformError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::NotFound { entity, id } => EvalPlatformError::NotFound { entity, id },
            StorageError::Conflict { entity, message } => EvalPlatformError::Conflict {
                message: format!("{entity}: {message}"),
                retryable: false,
            },
            StorageError::VersionMismatch { entity, id, .. } => EvalPlatformError::Conflict {
                message: format!("{entity} {id} was modified concurrently; reload and retry"),
                retryable: true,
            },
            StorageError::Backend { operation, message } => {
                log_storage_error(&operation, &message);
                EvalPlatformError::Storage {
                    operation,
                    details: message,
                }
            }
            StorageError::Serialization(message) => {
                log_storage_error("decode stored document", &message);
                EvalPlatformError::Storage {
                    operation: "decode stored document".to_string(),
                    details: message,
                }
            }
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
