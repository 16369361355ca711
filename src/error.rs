//! Error types for the infographic generation pipeline.
//!
//! `ApiError` display strings are the raw failure text that the classifier
//! matches against, so changing a message changes how failures are categorised.

use thiserror::Error;

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Artifact digest mismatch for {unit_id}: expected {expected}, got {actual}")]
    DigestMismatch {
        unit_id: String,
        expected: String,
        actual: String,
    },

    #[error("Corrupt record under {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("Store is in use by another infogen process: {0}")]
    Locked(String),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        StorageError::IoError(std::io::Error::new(
            std::io::ErrorKind::Other,
            err.to_string(),
        ))
    }
}

/// Errors surfaced by the session client and the orchestrator.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication failed. Please log in to NotebookLM.")]
    LoginRequired,

    #[error("Authentication failed ({0})")]
    Unauthorized(u16),

    #[error("Network request failed: {0}")]
    Network(String),

    #[error("Failed to reach NotebookLM: {0}")]
    Unreachable(u16),

    #[error("Failed to create notebook")]
    CreationFailed,

    #[error("Failed to add source")]
    SourceAttachFailed,

    #[error("Daily limit exceeded")]
    LimitExceeded,

    #[error("Timed out waiting for infographic ({attempts} polls exceeded)")]
    Timeout { attempts: u32 },

    #[error("Invalid source URL: {0}")]
    InvalidUrl(String),

    #[error("Another generation is already running ({0})")]
    Busy(String),

    #[error("Queue cannot be edited while it is running")]
    QueueLocked,

    #[error("No queue entry at index {0}")]
    QueueIndexOutOfRange(usize),

    #[error("Unit not found: {0}")]
    UnitNotFound(String),

    #[error("Artifact not stored for unit {0}")]
    ArtifactMissing(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

impl From<sled::Error> for ApiError {
    fn from(err: sled::Error) -> Self {
        ApiError::StorageError(StorageError::from(err))
    }
}
