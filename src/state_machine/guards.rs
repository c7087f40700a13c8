use super::errors::{GuardResult, StatusTransitionError};
use super::states::EvalRunStatus;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which statuses end an eval run's lifecycle.
///
/// Product intent on whether a failed run may still be updated has not been
/// settled, so the terminal set is a named policy chosen through configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalStatusPolicy {
    /// `EvalRunCompleted` and `EvalRunFailed` are both terminal
    #[default]
    CompletedOrFailed,
    /// Only `EvalRunCompleted` is terminal; failed runs may be moved again
    CompletedOnly,
}

impl TerminalStatusPolicy {
    pub fn terminal_statuses(&self) -> &'static [EvalRunStatus] {
        match self {
            Self::CompletedOrFailed => &[
                EvalRunStatus::EvalRunCompleted,
                EvalRunStatus::EvalRunFailed,
            ],
            Self::CompletedOnly => &[EvalRunStatus::EvalRunCompleted],
        }
    }

    pub fn is_terminal(&self, status: EvalRunStatus) -> bool {
        self.terminal_statuses().contains(&status)
    }
}

/// Validates proposed eval run status changes.
///
/// Only terminality and set membership are enforced. Non-terminal statuses may
/// move to any allowed status, including jumping straight to a terminal one.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusTransitionGuard {
    policy: TerminalStatusPolicy,
}

impl StatusTransitionGuard {
    pub fn new(policy: TerminalStatusPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> TerminalStatusPolicy {
        self.policy
    }

    pub fn is_terminal(&self, status: EvalRunStatus) -> bool {
        self.policy.is_terminal(status)
    }

    /// Check a transition from `current` to the raw `proposed` status name.
    ///
    /// Returns the parsed target status. A terminal current status rejects
    /// every proposal, including a repeat of itself, before the proposal is parsed.
    pub fn validate_transition(
        &self,
        current: EvalRunStatus,
        proposed: &str,
    ) -> GuardResult<EvalRunStatus> {
        if self.policy.is_terminal(current) {
            debug!(
                current = %current,
                proposed = proposed,
                "Rejected status change on terminal eval run"
            );
            return Err(StatusTransitionError::TerminalStateViolation { current });
        }

        EvalRunStatus::parse_lenient(proposed).ok_or_else(|| {
            StatusTransitionError::InvalidStatus {
                proposed: proposed.to_string(),
                allowed: EvalRunStatus::allowed_names(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses_reject_everything() {
        let guard = StatusTransitionGuard::default();
        for current in [EvalRunStatus::EvalRunCompleted, EvalRunStatus::EvalRunFailed] {
            for proposed in EvalRunStatus::ALL {
                let result = guard.validate_transition(current, proposed.as_str());
                assert_eq!(
                    result,
                    Err(StatusTransitionError::TerminalStateViolation { current })
                );
            }
            assert!(matches!(
                guard.validate_transition(current, "BogusStatus"),
                Err(StatusTransitionError::TerminalStateViolation { .. })
            ));
        }
    }

    #[test]
    fn test_unknown_status_is_rejected_with_allowed_list() {
        let guard = StatusTransitionGuard::default();
        match guard.validate_transition(EvalRunStatus::RequestSubmitted, "BogusStatus") {
            Err(StatusTransitionError::InvalidStatus { proposed, allowed }) => {
                assert_eq!(proposed, "BogusStatus");
                assert_eq!(allowed.len(), 6);
                assert!(allowed.contains(&"EvalRunFailed".to_string()));
            }
            other => panic!("expected InvalidStatus, got {other:?}"),
        }
    }

    #[test]
    fn test_non_terminal_moves_are_unordered() {
        let guard = StatusTransitionGuard::default();
        assert_eq!(
            guard.validate_transition(EvalRunStatus::RequestSubmitted, "EnrichingDataset"),
            Ok(EvalRunStatus::EnrichingDataset)
        );
        assert_eq!(
            guard.validate_transition(EvalRunStatus::RequestSubmitted, "EvalRunCompleted"),
            Ok(EvalRunStatus::EvalRunCompleted)
        );
        assert_eq!(
            guard.validate_transition(EvalRunStatus::EvalRunStarted, "RequestSubmitted"),
            Ok(EvalRunStatus::RequestSubmitted)
        );
    }

    #[test]
    fn test_completed_only_policy_reopens_failed_runs() {
        let guard = StatusTransitionGuard::new(TerminalStatusPolicy::CompletedOnly);
        assert!(!guard.is_terminal(EvalRunStatus::EvalRunFailed));
        assert_eq!(
            guard.validate_transition(EvalRunStatus::EvalRunFailed, "EvalRunStarted"),
            Ok(EvalRunStatus::EvalRunStarted)
        );
        assert!(guard
            .validate_transition(EvalRunStatus::EvalRunCompleted, "EvalRunStarted")
            .is_err());
    }

    #[test]
    fn test_policy_deserializes_from_snake_case() {
        let policy: TerminalStatusPolicy = serde_json::from_str("\"completed_only\"").unwrap();
        assert_eq!(policy, TerminalStatusPolicy::CompletedOnly);
    }
}
