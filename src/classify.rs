//! Failure classification.
//!
//! Maps raw failure text to a category and a short user-facing message.
//! Matching is case-insensitive substring search, first rule wins. Anything
//! unrecognised falls through to `Unknown` with the raw text kept verbatim.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    Auth,
    Network,
    Limit,
    Source,
    Timeout,
    Unknown,
}

impl FailureKind {
    /// Systemic failures invalidate any further work, not just the current unit.
    pub fn is_systemic(self) -> bool {
        matches!(self, FailureKind::Auth | FailureKind::Limit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub kind: FailureKind,
    pub message: String,
}

pub const AUTH_MESSAGE: &str = "Session expired. Please log in to NotebookLM again.";
pub const NETWORK_MESSAGE: &str = "Connection failed. Please check your internet.";
pub const LIMIT_MESSAGE: &str = "Daily generation limit reached. Please try again tomorrow.";
pub const SOURCE_MESSAGE: &str =
    "Could not add this source. It might be private, too long, or age-restricted.";
pub const TIMEOUT_MESSAGE: &str =
    "Generation timed out. Servers might be busy. Please try again.";

const RULES: &[(FailureKind, &[&str], &str)] = &[
    (
        FailureKind::Auth,
        &["401", "authentication failed", "log in"],
        AUTH_MESSAGE,
    ),
    (
        FailureKind::Network,
        &["failed to fetch", "network"],
        NETWORK_MESSAGE,
    ),
    (
        FailureKind::Limit,
        &["daily limit", "limit exceeded"],
        LIMIT_MESSAGE,
    ),
    (FailureKind::Source, &["failed to add source"], SOURCE_MESSAGE),
    (FailureKind::Timeout, &["timed out", "timeout"], TIMEOUT_MESSAGE),
];

pub fn classify(raw: &str) -> Classification {
    let lowered = raw.to_lowercase();
    for (kind, needles, message) in RULES {
        if needles.iter().any(|needle| lowered.contains(needle)) {
            return Classification {
                kind: *kind,
                message: (*message).to_string(),
            };
        }
    }
    Classification {
        kind: FailureKind::Unknown,
        message: raw.to_string(),
    }
}
