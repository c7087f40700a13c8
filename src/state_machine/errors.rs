use super::states::EvalRunStatus;
use crate::errors::EvalPlatformError;
use thiserror::Error;

/// Rejections produced by the status transition guard
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatusTransitionError {
    #[error("Eval run is already in a terminal state ({current}); no further status changes are allowed")]
    TerminalStateViolation { current: EvalRunStatus },

    #[error("Invalid status '{proposed}'")]
    InvalidStatus {
        proposed: String,
        allowed: Vec<String>,
    },
}

pub type GuardResult<T> = Result<T, StatusTransitionError>;

impl From<StatusTransitionError> for EvalPlatformError {
    fn from(err: StatusTransitionError) -> Self {
        match err {
            StatusTransitionError::TerminalStateViolation { current } => {
                EvalPlatformError::TerminalStateViolation { current }
            }
            StatusTransitionError::InvalidStatus { proposed, allowed } => {
                EvalPlatformError::InvalidStatus { proposed, allowed }
            }
        }
    }
}
