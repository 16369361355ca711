//! Shared presentation helpers.

use owo_colors::OwoColorize;
use serde::Serialize;

use crate::error::{ApiError, StorageError};

/// Format a section heading with bold/underline.
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

/// Status word colored by outcome: green done, red failed, yellow in flight.
pub fn styled_status(status: &str) -> String {
    match status {
        "COMPLETED" => status.green().to_string(),
        "FAILED" | "AUTH_REQUIRED" | "LIMIT_EXCEEDED" => status.red().to_string(),
        "RUNNING" | "AUTH_PENDING" => status.yellow().to_string(),
        _ => status.dimmed().to_string(),
    }
}

pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value).map_err(|e| {
        ApiError::StorageError(StorageError::Corrupt {
            key: "output".to_string(),
            reason: e.to_string(),
        })
    })
}

pub fn format_millis(ms: u64) -> String {
    chrono::DateTime::<chrono::Utc>::from_timestamp_millis(ms as i64)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ms.to_string())
}
