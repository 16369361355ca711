//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::classify::{classify, FailureKind};
use crate::error::ApiError;

/// Map domain/service errors to a string for CLI output.
///
/// Generation failures carry the raw remote text; a classified hint is appended
/// when the classifier recognises it.
pub fn map_error(e: &ApiError) -> String {
    let raw = e.to_string();
    let classification = classify(&raw);
    if classification.kind == FailureKind::Unknown || classification.message == raw {
        raw
    } else {
        format!("{}\n{}", raw, classification.message)
    }
}
