//! Error types for the evaluation platform core.
//!
//! Every core operation returns an [`EvalPlatformResult`] instead of relying on
//! panics or error identity inspection. Controllers map [`ErrorKind`] to a
//! response code and show [`EvalPlatformError::public_message`] to the caller.

use crate::state_machine::EvalRunStatus;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalPlatformError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Conflict: {message}")]
    Conflict { message: String, retryable: bool },

    #[error("Cannot update status: eval run is already in a terminal state ({current})")]
    TerminalStateViolation { current: EvalRunStatus },

    #[error("Invalid status '{proposed}'. Allowed values: {}", .allowed.join(", "))]
    InvalidStatus {
        proposed: String,
        allowed: Vec<String>,
    },

    #[error("Storage error during {operation}: {details}")]
    Storage { operation: String, details: String },

    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Flat classification of [`EvalPlatformError`] for response mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    TerminalStateViolation,
    InvalidStatus,
    Storage,
    Authorization,
    Configuration,
}

impl ErrorKind {
    /// HTTP status code a controller should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            // Clients treat a 400 naming a terminal state as "already finished"
            Self::Validation | Self::InvalidStatus | Self::TerminalStateViolation => 400,
            Self::Authorization => 403,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::Storage | Self::Configuration => 500,
        }
    }
}

impl EvalPlatformError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::TerminalStateViolation { .. } => ErrorKind::TerminalStateViolation,
            Self::InvalidStatus { .. } => ErrorKind::InvalidStatus,
            Self::Storage { .. } => ErrorKind::Storage,
            Self::Authorization(_) => ErrorKind::Authorization,
            Self::Configuration(_) => ErrorKind::Configuration,
        }
    }

    /// Message safe to hand to an external caller.
    ///
    /// Backend details of storage and configuration failures stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::Storage { operation, .. } => {
                format!("A storage error occurred while trying to {operation}")
            }
            Self::Configuration(_) => "The service is misconfigured".to_string(),
            other => other.to_string(),
        }
    }

    /// Whether the caller may retry the same request unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { retryable: true, .. })
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<validator::ValidationErrors> for EvalPlatformError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

impl From<serde_json::Error> for EvalPlatformError {
    fn from(error: serde_json::Error) -> Self {
        Self::Validation(format!("Invalid JSON payload: {error}"))
    }
}

pub type EvalPlatformResult<T> = Result<T, EvalPlatformError>;
