//! Cache backend failures.
//!
//! These never reach a caller of the orchestrator. [`CacheAsideEngine`] counts
//! them in `backend_errors`, logs them, and falls through to storage.
//!
//! [`CacheAsideEngine`]: crate::cache::CacheAsideEngine

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    /// The backend could not be reached or connected to
    #[error("Cache backend unreachable: {0}")]
    Unreachable(String),

    /// The backend was reached but rejected a command for a key
    #[error("Cache {command} failed for key '{key}': {details}")]
    Command {
        command: &'static str,
        key: String,
        details: String,
    },
}

impl CacheError {
    pub fn command(command: &'static str, key: &str, details: impl ToString) -> Self {
        Self::Command {
            command,
            key: key.to_string(),
            details: details.to_string(),
        }
    }

    /// True when retrying against the same backend is pointless until it recovers
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }
}

pub type CacheResult<T> = Result<T, CacheError>;
