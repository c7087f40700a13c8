//! Container name derivation from agent ids

use crate::constants::container_names::{MAX_LENGTH, MIN_LENGTH};
use crate::errors::{EvalPlatformError, EvalPlatformResult};

/// Blob container name for a new agent container.
///
/// Lowercase ASCII letters, digits and single hyphens, starting and ending
/// alphanumeric, padded with `0` to the minimum length and truncated to the
/// maximum. Whitespace is dropped and any other character becomes a hyphen.
pub fn sanitize_container_name(agent_id: &str) -> EvalPlatformResult<String> {
    if agent_id.trim().is_empty() {
        return Err(EvalPlatformError::validation("Agent id cannot be empty"));
    }

    let mut name = String::with_capacity(agent_id.len());
    for c in agent_id.chars().filter(|c| !c.is_whitespace()) {
        let c = c.to_ascii_lowercase();
        let mapped = if c.is_ascii_lowercase() || c.is_ascii_digit() {
            c
        } else {
            '-'
        };
        if mapped == '-' && name.ends_with('-') {
            continue;
        }
        name.push(mapped);
    }

    let mut name = name.trim_matches('-').to_string();
    pad(&mut name);

    if name.len() > MAX_LENGTH {
        name.truncate(MAX_LENGTH);
        name = name.trim_end_matches('-').to_string();
        pad(&mut name);
    }

    Ok(name)
}

fn pad(name: &mut String) {
    while name.len() < MIN_LENGTH {
        name.push('0');
    }
}

/// Container of runs created before container names were recorded: the agent
/// id with all whitespace removed, case preserved.
pub fn legacy_container_name(agent_id: &str) -> String {
    agent_id.chars().filter(|c| !c.is_whitespace()).collect()
}
