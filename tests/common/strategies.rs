//! proptest strategies for statuses, status names and agent ids
#![allow(dead_code)]

use evalplatform_core::{EvalRunStatus, TerminalStatusPolicy};
use proptest::prelude::*;

pub fn status_strategy() -> impl Strategy<Value = EvalRunStatus> {
    prop::sample::select(EvalRunStatus::ALL.to_vec())
}

pub fn policy_strategy() -> impl Strategy<Value = TerminalStatusPolicy> {
    prop_oneof![
        Just(TerminalStatusPolicy::CompletedOrFailed),
        Just(TerminalStatusPolicy::CompletedOnly),
    ]
}

/// A policy with one of the statuses it treats as terminal
pub fn terminal_status_strategy() -> impl Strategy<Value = (TerminalStatusPolicy, EvalRunStatus)> {
    policy_strategy().prop_flat_map(|policy| {
        (
            Just(policy),
            prop::sample::select(policy.terminal_statuses().to_vec()),
        )
    })
}

/// A policy with one of the statuses it leaves open
pub fn open_status_strategy() -> impl Strategy<Value = (TerminalStatusPolicy, EvalRunStatus)> {
    policy_strategy().prop_flat_map(|policy| {
        let open: Vec<EvalRunStatus> = EvalRunStatus::ALL
            .into_iter()
            .filter(|status| !policy.is_terminal(*status))
            .collect();
        (Just(policy), prop::sample::select(open))
    })
}

/// A valid status name with every ASCII letter's case randomized
pub fn case_mangled_status_strategy() -> impl Strategy<Value = (EvalRunStatus, String)> {
    (status_strategy(), prop::collection::vec(any::<bool>(), 32)).prop_map(|(status, flips)| {
        let mangled = status
            .as_str()
            .chars()
            .zip(flips.into_iter().cycle())
            .map(|(c, upper)| {
                if upper {
                    c.to_ascii_uppercase()
                } else {
                    c.to_ascii_lowercase()
                }
            })
            .collect();
        (status, mangled)
    })
}

/// Free-form status proposals, mostly not valid names
pub fn arbitrary_status_name_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z ]{0,40}"
}

/// Agent ids as they arrive from callers: mixed case, spaces and punctuation
pub fn agent_id_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 _.@-]{0,90}".prop_filter("agent id needs a non-blank character", |s| {
        !s.trim().is_empty()
    })
}
