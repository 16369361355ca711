//! Durable sled-backed generation state store.

use std::io;
use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::{CompareAndSwapError, Db, Tree};
use tracing::{debug, info};

use crate::error::{ApiError, StorageError};
use crate::state::types::{
    ArtifactRef, GenerationState, GenerationStatus, LockRecord, LockScope, QueueEntry,
    QueueItem, StatePatch, UnitId,
};

const TREE_STATES: &str = "generation_states";
const TREE_ARTIFACTS: &str = "artifacts";
const TREE_CONTROL: &str = "control";
const TREE_QUEUE: &str = "queue";

const KEY_LOCK: &[u8] = b"lock";
const KEY_FOCUSED: &[u8] = b"focused_unit";
const KEY_PROGRESS: &[u8] = b"queue_progress";
const KEY_ENTRIES: &[u8] = b"entries";

pub const STALE_MESSAGE: &str = "Operation timed out (stale)";
pub const INTERRUPTED_MESSAGE: &str = "Interrupted by restart";

/// Outcome of [`StateStore::sweep_abandoned`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub interrupted: Vec<UnitId>,
    pub lock_cleared: bool,
}

/// Single-writer store. Every mutation is read-modify-write of one record.
#[derive(Clone)]
pub struct StateStore {
    db: Db,
    states: Tree,
    artifacts: Tree,
    control: Tree,
    queue: Tree,
}

impl StateStore {
    /// Open the store directory. A second process holding the directory gets
    /// [`StorageError::Locked`].
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let db = sled::open(path).map_err(|err| match err {
            sled::Error::Io(ref io_err) if io_err.to_string().contains("lock") => {
                StorageError::Locked(path.display().to_string())
            }
            other => to_storage_io(other),
        })?;
        Self::new(db)
    }

    pub fn new(db: Db) -> Result<Self, StorageError> {
        let states = db.open_tree(TREE_STATES).map_err(to_storage_io)?;
        let artifacts = db.open_tree(TREE_ARTIFACTS).map_err(to_storage_io)?;
        let control = db.open_tree(TREE_CONTROL).map_err(to_storage_io)?;
        let queue = db.open_tree(TREE_QUEUE).map_err(to_storage_io)?;
        Ok(Self {
            db,
            states,
            artifacts,
            control,
            queue,
        })
    }

    pub fn shared(db: Db) -> Result<Arc<Self>, StorageError> {
        Ok(Arc::new(Self::new(db)?))
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    // -- per-unit records --------------------------------------------------

    /// Raw record, without the staleness rule.
    pub fn get_state(&self, unit_id: &UnitId) -> Result<Option<GenerationState>, StorageError> {
        get_json(&self.states, unit_id.as_str().as_bytes())
    }

    /// Record as observers should see it: a RUNNING record older than
    /// `stale_after_ms` is failed and persisted before being returned.
    pub fn read_state(
        &self,
        unit_id: &UnitId,
        now: u64,
        stale_after_ms: u64,
    ) -> Result<Option<GenerationState>, StorageError> {
        let Some(mut state) = self.get_state(unit_id)? else {
            return Ok(None);
        };
        if state.is_stale(now, stale_after_ms) {
            info!(unit_id = %unit_id, token = ?state.operation_token, "failing stale generation");
            state.apply(
                StatePatch::failed(GenerationStatus::Failed, STALE_MESSAGE),
                now,
            );
            self.put_state(&state)?;
        }
        Ok(Some(state))
    }

    /// Merge `patch` into the unit's record, creating it if absent.
    pub fn update_state(
        &self,
        unit_id: &UnitId,
        patch: StatePatch,
        now: u64,
    ) -> Result<GenerationState, StorageError> {
        let mut state = self
            .get_state(unit_id)?
            .unwrap_or_else(|| GenerationState::new(unit_id.clone(), now));
        state.apply(patch, now);
        self.put_state(&state)?;
        Ok(state)
    }

    fn put_state(&self, state: &GenerationState) -> Result<(), StorageError> {
        put_json(&self.states, state.unit_id.as_str().as_bytes(), state)
    }

    pub fn list_states(&self) -> Result<Vec<GenerationState>, StorageError> {
        let mut out = Vec::new();
        for result in self.states.iter() {
            let (key, value) = result.map_err(to_storage_io)?;
            out.push(decode(&key, &value)?);
        }
        Ok(out)
    }

    /// Forget everything about a unit and focus it, so observers show a fresh start.
    pub fn reset_state(&self, unit_id: &UnitId) -> Result<bool, StorageError> {
        let key = unit_id.as_str().as_bytes();
        let existed = self.states.remove(key).map_err(to_storage_io)?.is_some();
        self.artifacts.remove(key).map_err(to_storage_io)?;
        self.set_focused(unit_id)?;
        Ok(existed)
    }

    /// Completed records that carry an artifact, newest first.
    pub fn gallery(&self) -> Result<Vec<GenerationState>, StorageError> {
        let mut completed: Vec<GenerationState> = self
            .list_states()?
            .into_iter()
            .filter(|s| s.artifact().is_some())
            .collect();
        completed.sort_by_key(|s| std::cmp::Reverse(s.completed_at.unwrap_or(0)));
        Ok(completed)
    }

    // -- artifacts ---------------------------------------------------------

    /// Store image bytes for a unit and describe them.
    pub fn put_artifact(
        &self,
        unit_id: &UnitId,
        source_url: &str,
        content_type: Option<String>,
        bytes: &[u8],
    ) -> Result<ArtifactRef, StorageError> {
        let digest = blake3::hash(bytes).to_hex().to_string();
        self.artifacts
            .insert(unit_id.as_str().as_bytes(), bytes)
            .map_err(to_storage_io)?;
        Ok(ArtifactRef {
            source_url: source_url.to_string(),
            content_type,
            byte_len: bytes.len() as u64,
            digest: Some(digest),
        })
    }

    /// Stored bytes for a completed unit, verified against the recorded digest.
    pub fn artifact_bytes(
        &self,
        unit_id: &UnitId,
    ) -> Result<Option<(ArtifactRef, Vec<u8>)>, StorageError> {
        let Some(state) = self.get_state(unit_id)? else {
            return Ok(None);
        };
        let Some(artifact) = state.artifact().cloned() else {
            return Ok(None);
        };
        let Some(expected) = artifact.digest.clone() else {
            return Ok(None);
        };
        let Some(raw) = self
            .artifacts
            .get(unit_id.as_str().as_bytes())
            .map_err(to_storage_io)?
        else {
            return Ok(None);
        };
        let actual = blake3::hash(&raw).to_hex().to_string();
        if actual != expected {
            return Err(StorageError::DigestMismatch {
                unit_id: unit_id.to_string(),
                expected,
                actual,
            });
        }
        Ok(Some((artifact, raw.to_vec())))
    }

    // -- control -----------------------------------------------------------

    pub fn focused(&self) -> Result<Option<UnitId>, StorageError> {
        get_json(&self.control, KEY_FOCUSED)
    }

    pub fn set_focused(&self, unit_id: &UnitId) -> Result<(), StorageError> {
        put_json(&self.control, KEY_FOCUSED, unit_id)
    }

    pub fn progress_label(&self) -> Result<Option<String>, StorageError> {
        get_json(&self.control, KEY_PROGRESS)
    }

    pub fn set_progress_label(&self, label: Option<&str>) -> Result<(), StorageError> {
        match label {
            Some(label) => put_json(&self.control, KEY_PROGRESS, &label),
            None => {
                self.control.remove(KEY_PROGRESS).map_err(to_storage_io)?;
                Ok(())
            }
        }
    }

    pub fn lock_record(&self) -> Result<Option<LockRecord>, StorageError> {
        get_json(&self.control, KEY_LOCK)
    }

    /// Install `record` if no lock is held. Returns the current holder otherwise.
    pub(crate) fn try_lock(&self, record: &LockRecord) -> Result<Option<LockRecord>, StorageError> {
        let value = serde_json::to_vec(record).map_err(|e| to_storage_data(KEY_LOCK, e))?;
        loop {
            match self
                .control
                .compare_and_swap(KEY_LOCK, None as Option<&[u8]>, Some(value.clone()))
                .map_err(to_storage_io)?
            {
                Ok(()) => return Ok(None),
                Err(CompareAndSwapError {
                    current: Some(raw), ..
                }) => return Ok(Some(decode(KEY_LOCK, &raw)?)),
                // released between attempts
                Err(CompareAndSwapError { current: None, .. }) => continue,
            }
        }
    }

    pub(crate) fn unlock(&self) -> Result<bool, StorageError> {
        Ok(self.control.remove(KEY_LOCK).map_err(to_storage_io)?.is_some())
    }

    fn queue_locked(&self) -> Result<bool, StorageError> {
        Ok(self
            .lock_record()?
            .map(|record| record.holder == LockScope::Queue)
            .unwrap_or(false))
    }

    // -- queue -------------------------------------------------------------

    pub fn queue_entries(&self) -> Result<Vec<QueueEntry>, StorageError> {
        Ok(get_json(&self.queue, KEY_ENTRIES)?.unwrap_or_default())
    }

    fn put_entries(&self, entries: &[QueueEntry]) -> Result<(), StorageError> {
        put_json(&self.queue, KEY_ENTRIES, &entries)
    }

    /// Append an entry. Returns `false` when the unit is already queued.
    pub fn enqueue(&self, entry: QueueEntry) -> Result<bool, ApiError> {
        if self.queue_locked()? {
            return Err(ApiError::QueueLocked);
        }
        let mut entries = self.queue_entries()?;
        if entries.iter().any(|e| e.unit_id == entry.unit_id) {
            return Ok(false);
        }
        debug!(unit_id = %entry.unit_id, position = entries.len(), "queued");
        entries.push(entry);
        self.put_entries(&entries)?;
        Ok(true)
    }

    pub fn remove_at(&self, index: usize) -> Result<QueueEntry, ApiError> {
        if self.queue_locked()? {
            return Err(ApiError::QueueLocked);
        }
        let mut entries = self.queue_entries()?;
        if index >= entries.len() {
            return Err(ApiError::QueueIndexOutOfRange(index));
        }
        let removed = entries.remove(index);
        self.put_entries(&entries)?;
        Ok(removed)
    }

    pub fn clear_queue(&self) -> Result<usize, ApiError> {
        if self.queue_locked()? {
            return Err(ApiError::QueueLocked);
        }
        let count = self.queue_entries()?.len();
        self.put_entries(&[])?;
        Ok(count)
    }

    /// Record that the run identified by `token` picked up this unit.
    pub fn mark_queue_attempt(&self, unit_id: &UnitId, token: u64) -> Result<(), StorageError> {
        let mut entries = self.queue_entries()?;
        for entry in entries.iter_mut().filter(|e| &e.unit_id == unit_id) {
            entry.attempt_token = Some(token);
        }
        self.put_entries(&entries)
    }

    /// Queue list derived from the entries and the per-unit records.
    pub fn queue_view(&self, now: u64, stale_after_ms: u64) -> Result<Vec<QueueItem>, StorageError> {
        let entries = self.queue_entries()?;
        let mut out = Vec::with_capacity(entries.len());
        for entry in &entries {
            let record = self.read_state(&entry.unit_id, now, stale_after_ms)?;
            out.push(QueueItem::project(entry, record.as_ref()));
        }
        Ok(out)
    }

    // -- maintenance -------------------------------------------------------

    /// Fail every in-progress record left behind by a dead driver and drop its lock.
    /// Only valid while no orchestration runs in this process.
    pub fn sweep_abandoned(&self, now: u64) -> Result<SweepReport, StorageError> {
        let mut report = SweepReport::default();
        for mut state in self.list_states()? {
            if state.status.is_in_progress() {
                state.apply(
                    StatePatch::failed(GenerationStatus::Failed, INTERRUPTED_MESSAGE),
                    now,
                );
                self.put_state(&state)?;
                report.interrupted.push(state.unit_id.clone());
            }
        }
        report.lock_cleared = self.unlock()?;
        if report.lock_cleared {
            self.set_progress_label(None)?;
        }
        Ok(report)
    }

    /// Delete completed records (and blobs) older than `ttl_ms` by completion time.
    pub fn purge_expired(&self, now: u64, ttl_ms: u64) -> Result<usize, StorageError> {
        let mut removed = 0usize;
        for state in self.list_states()? {
            if state.status != GenerationStatus::Completed {
                continue;
            }
            let completed_at = state.completed_at.unwrap_or(state.updated_at);
            if now.saturating_sub(completed_at) > ttl_ms {
                let key = state.unit_id.as_str().as_bytes();
                self.states.remove(key).map_err(to_storage_io)?;
                if state.stored_artifact().is_some() {
                    self.artifacts.remove(key).map_err(to_storage_io)?;
                }
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush().map_err(to_storage_io)?;
        Ok(())
    }
}

fn get_json<T: DeserializeOwned>(tree: &Tree, key: &[u8]) -> Result<Option<T>, StorageError> {
    let Some(raw) = tree.get(key).map_err(to_storage_io)? else {
        return Ok(None);
    };
    Ok(Some(decode(key, &raw)?))
}

fn put_json<T: Serialize + ?Sized>(tree: &Tree, key: &[u8], value: &T) -> Result<(), StorageError> {
    let encoded = serde_json::to_vec(value).map_err(|e| to_storage_data(key, e))?;
    tree.insert(key, encoded).map_err(to_storage_io)?;
    Ok(())
}

fn decode<T: DeserializeOwned>(key: &[u8], raw: &[u8]) -> Result<T, StorageError> {
    serde_json::from_slice(raw).map_err(|e| to_storage_data(key, e))
}

fn to_storage_io(err: sled::Error) -> StorageError {
    StorageError::IoError(io::Error::new(io::ErrorKind::Other, err.to_string()))
}

fn to_storage_data(key: &[u8], err: serde_json::Error) -> StorageError {
    StorageError::Corrupt {
        key: String::from_utf8_lossy(key).into_owned(),
        reason: err.to_string(),
    }
}
