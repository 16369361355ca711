//! Outbound status notifications for collaborators (UI, CLI followers).
//!
//! Every status transition the orchestrator persists is also published here.
//! A notification with no `unit_id` is a global broadcast about the queue as a whole.

pub mod bus;
pub mod ingestor;
pub mod log;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ApiError, StorageError};
use crate::notify::bus::StatusBus;
use crate::notify::ingestor::{EventIngestor, SharedIngestor};
use crate::notify::log::EventLog;
use crate::state::{ArtifactRef, GenerationStatus, UnitId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub seq: u64,
    pub ts: String,
    pub unit_id: Option<UnitId>,
    pub status: GenerationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<ArtifactRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_progress: Option<String>,
}

impl StatusEvent {
    pub fn from_envelope(envelope: StatusEnvelope, seq: u64) -> Self {
        Self {
            seq,
            ts: envelope.ts,
            unit_id: envelope.unit_id,
            status: envelope.status,
            artifact: envelope.artifact,
            error: envelope.error,
            queue_progress: envelope.queue_progress,
        }
    }

    pub fn is_global(&self) -> bool {
        self.unit_id.is_none()
    }
}

/// A notification before the ingestor assigns its sequence number.
#[derive(Debug, Clone)]
pub struct StatusEnvelope {
    pub ts: String,
    pub unit_id: Option<UnitId>,
    pub status: GenerationStatus,
    pub artifact: Option<ArtifactRef>,
    pub error: Option<String>,
    pub queue_progress: Option<String>,
}

impl StatusEnvelope {
    pub fn unit(unit_id: UnitId, status: GenerationStatus) -> Self {
        Self::with_now(Some(unit_id), status)
    }

    pub fn global(status: GenerationStatus) -> Self {
        Self::with_now(None, status)
    }

    fn with_now(unit_id: Option<UnitId>, status: GenerationStatus) -> Self {
        Self {
            ts: chrono::Utc::now().to_rfc3339(),
            unit_id,
            status,
            artifact: None,
            error: None,
            queue_progress: None,
        }
    }

    pub fn with_artifact(mut self, artifact: Option<ArtifactRef>) -> Self {
        self.artifact = artifact;
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_queue_progress(mut self, progress: impl Into<String>) -> Self {
        self.queue_progress = Some(progress.into());
        self
    }
}

/// Bus, ingestor and log wired together over the shared database.
#[derive(Clone)]
pub struct NotificationRuntime {
    log: Arc<EventLog>,
    bus: StatusBus,
    ingestor: SharedIngestor,
}

impl NotificationRuntime {
    pub fn new(db: sled::Db) -> Result<Self, StorageError> {
        let log = Arc::new(EventLog::new(db)?);
        let (bus, rx) = StatusBus::new_pair();
        let ingestor = SharedIngestor::new(EventIngestor::new(log.clone(), rx));
        Ok(Self { log, bus, ingestor })
    }

    /// Publish and persist one notification. Returns its sequence number.
    pub fn emit(&self, envelope: StatusEnvelope) -> Result<Option<u64>, ApiError> {
        self.bus.emit(envelope).map_err(to_api_error)?;
        let seq = self.ingestor.drain()?;
        self.log.flush()?;
        Ok(seq)
    }

    /// Notifications never abort a generation; failures are only logged.
    pub fn emit_best_effort(&self, envelope: StatusEnvelope) {
        let unit_id = envelope.unit_id.clone();
        let status = envelope.status;
        if let Err(err) = self.emit(envelope) {
            warn!(
                unit_id = ?unit_id,
                status = %status,
                error = %err,
                "failed to emit status notification"
            );
        }
    }

    pub fn read_events_after(&self, after_seq: u64) -> Result<Vec<StatusEvent>, ApiError> {
        Ok(self.log.read_events_after(after_seq)?)
    }
}

fn to_api_error(err: std::sync::mpsc::SendError<StatusEnvelope>) -> ApiError {
    ApiError::StorageError(StorageError::IoError(std::io::Error::new(
        std::io::ErrorKind::Other,
        err.to_string(),
    )))
}
