//! Persisted records: per-unit generation state, queue entries, artifacts.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use url::Url;

use crate::error::ApiError;

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Stable identifier of a unit of work, derived from its source URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(String);

impl UnitId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Video id for YouTube links, otherwise a digest of the URL.
    pub fn from_url(raw: &str) -> Result<Self, ApiError> {
        let url = Url::parse(raw).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", raw, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ApiError::InvalidUrl(format!("{}: unsupported scheme", raw)));
        }
        let host = url.host_str().unwrap_or_default();
        if host.contains("youtube.com") {
            return url
                .query_pairs()
                .find(|(k, _)| k == "v")
                .map(|(_, v)| v.into_owned())
                .filter(|v| !v.is_empty())
                .map(Self)
                .ok_or_else(|| ApiError::InvalidUrl(format!("{}: missing video id", raw)));
        }
        if host.contains("youtu.be") {
            let id = url.path().trim_start_matches('/');
            if id.is_empty() {
                return Err(ApiError::InvalidUrl(format!("{}: missing video id", raw)));
            }
            return Ok(Self(id.to_string()));
        }
        let digest = blake3::hash(url.as_str().as_bytes()).to_hex();
        Ok(Self(format!("url-{}", &digest.as_str()[..16])))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GenerationStatus {
    Idle,
    Running,
    Completed,
    Failed,
    AuthRequired,
    LimitExceeded,
    /// Legacy transitional state: awaiting an external login. Never auto-retried.
    AuthPending,
}

impl GenerationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            GenerationStatus::Idle => "IDLE",
            GenerationStatus::Running => "RUNNING",
            GenerationStatus::Completed => "COMPLETED",
            GenerationStatus::Failed => "FAILED",
            GenerationStatus::AuthRequired => "AUTH_REQUIRED",
            GenerationStatus::LimitExceeded => "LIMIT_EXCEEDED",
            GenerationStatus::AuthPending => "AUTH_PENDING",
        }
    }

    /// Statuses whose record carries a meaningful `error`.
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            GenerationStatus::Failed | GenerationStatus::AuthRequired | GenerationStatus::LimitExceeded
        )
    }

    pub fn is_in_progress(self) -> bool {
        matches!(self, GenerationStatus::Running | GenerationStatus::AuthPending)
    }
}

impl std::fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to a completed image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub source_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub byte_len: u64,
    /// blake3 hex digest of the stored bytes; `None` when only the URL is known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl ArtifactRef {
    pub fn url_only(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            content_type: None,
            byte_len: 0,
            digest: None,
        }
    }

    pub fn has_blob(&self) -> bool {
        self.digest.is_some()
    }
}

/// Per-unit generation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationState {
    pub unit_id: UnitId,
    pub status: GenerationStatus,
    /// Millisecond timestamp of the latest RUNNING transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_token: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    artifact: Option<ArtifactRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<u64>,
    pub updated_at: u64,
}

impl GenerationState {
    pub fn new(unit_id: UnitId, now: u64) -> Self {
        Self {
            unit_id,
            status: GenerationStatus::Idle,
            operation_token: None,
            title: None,
            artifact: None,
            error: None,
            completed_at: None,
            updated_at: now,
        }
    }

    /// The artifact, only while COMPLETED.
    pub fn artifact(&self) -> Option<&ArtifactRef> {
        match self.status {
            GenerationStatus::Completed => self.artifact.as_ref(),
            _ => None,
        }
    }

    /// The failure message, only while in a failure status.
    pub fn error(&self) -> Option<&str> {
        if self.status.is_failure() {
            self.error.as_deref()
        } else {
            None
        }
    }

    /// Artifact reference regardless of status, for blob housekeeping.
    pub(crate) fn stored_artifact(&self) -> Option<&ArtifactRef> {
        self.artifact.as_ref()
    }

    /// A RUNNING record whose token is older than `stale_after_ms` is presumed dead.
    pub fn is_stale(&self, now: u64, stale_after_ms: u64) -> bool {
        self.status == GenerationStatus::Running
            && self
                .operation_token
                .map(|token| now.saturating_sub(token) > stale_after_ms)
                .unwrap_or(false)
    }

    pub fn apply(&mut self, patch: StatePatch, now: u64) {
        if let Some(title) = patch.title {
            self.title = Some(title);
        }
        if let Some(status) = patch.status {
            self.status = status;
            match status {
                GenerationStatus::Running => {
                    self.error = None;
                    if patch.operation_token.is_some() {
                        self.operation_token = patch.operation_token;
                    }
                }
                GenerationStatus::Completed => {
                    self.error = None;
                    if patch.artifact.is_some() {
                        self.artifact = patch.artifact;
                    }
                    let previous = self.completed_at.unwrap_or(0);
                    self.completed_at = Some(previous.max(now));
                }
                status if status.is_failure() => {
                    self.error = patch.error;
                }
                _ => {}
            }
        }
        self.updated_at = now;
    }
}

/// Partial update merged into a [`GenerationState`].
///
/// Fields left `None` are preserved; a status change replaces the fields that
/// status owns (error on failure, artifact on completion).
#[derive(Debug, Clone, Default)]
pub struct StatePatch {
    pub status: Option<GenerationStatus>,
    pub operation_token: Option<u64>,
    pub title: Option<String>,
    pub artifact: Option<ArtifactRef>,
    pub error: Option<String>,
}

impl StatePatch {
    pub fn running(operation_token: u64, title: Option<String>) -> Self {
        Self {
            status: Some(GenerationStatus::Running),
            operation_token: Some(operation_token),
            title,
            ..Self::default()
        }
    }

    pub fn completed(artifact: ArtifactRef) -> Self {
        Self {
            status: Some(GenerationStatus::Completed),
            artifact: Some(artifact),
            ..Self::default()
        }
    }

    pub fn failed(status: GenerationStatus, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            error: Some(message.into()),
            ..Self::default()
        }
    }
}

/// Stored queue membership. Status is not stored here; see [`QueueItem`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub unit_id: UnitId,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Operation token of the queue run that picked this entry up.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt_token: Option<u64>,
}

impl QueueEntry {
    pub fn new(unit_id: UnitId, url: impl Into<String>, title: Option<String>) -> Self {
        Self {
            unit_id,
            url: url.into(),
            title,
            attempt_token: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueItemStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Queue view projected from a [`QueueEntry`] and its unit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    pub unit_id: UnitId,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub status: QueueItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<ArtifactRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueueItem {
    pub fn project(entry: &QueueEntry, record: Option<&GenerationState>) -> Self {
        let attempted = record.filter(|_| entry.attempt_token.is_some());
        let status = match attempted.map(|r| r.status) {
            None => QueueItemStatus::Pending,
            Some(GenerationStatus::Running) | Some(GenerationStatus::AuthPending) => {
                QueueItemStatus::Running
            }
            Some(GenerationStatus::Completed) => QueueItemStatus::Completed,
            Some(status) if status.is_failure() => QueueItemStatus::Failed,
            Some(_) => QueueItemStatus::Pending,
        };
        Self {
            unit_id: entry.unit_id.clone(),
            url: entry.url.clone(),
            title: entry.title.clone(),
            status,
            artifact: attempted.and_then(|r| r.artifact().cloned()),
            error: attempted.and_then(|r| r.error().map(str::to_string)),
        }
    }
}

/// Which kind of orchestration holds the global lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockScope {
    Single,
    Queue,
}

impl std::fmt::Display for LockScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockScope::Single => f.write_str("single"),
            LockScope::Queue => f.write_str("queue"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    pub holder: LockScope,
    pub acquired_at: u64,
}
