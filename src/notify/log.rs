//! Durable sequenced log of status notifications.

use std::io;

use serde::{Deserialize, Serialize};
use sled::{Db, Tree};

use crate::error::StorageError;
use crate::notify::StatusEvent;

const TREE_EVENTS: &str = "status_events";
const TREE_META: &str = "status_meta";
const KEY_META: &[u8] = b"meta";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogMeta {
    pub next_seq: u64,
    pub updated_at_ms: u64,
}

#[derive(Clone)]
pub struct EventLog {
    db: Db,
    events: Tree,
    meta: Tree,
}

impl EventLog {
    pub fn new(db: Db) -> Result<Self, StorageError> {
        let events = db.open_tree(TREE_EVENTS).map_err(to_storage_io)?;
        let meta = db.open_tree(TREE_META).map_err(to_storage_io)?;
        Ok(Self { db, events, meta })
    }

    pub fn get_meta(&self) -> Result<Option<LogMeta>, StorageError> {
        let Some(raw) = self.meta.get(KEY_META).map_err(to_storage_io)? else {
            return Ok(None);
        };
        let parsed = serde_json::from_slice(&raw).map_err(|e| to_storage_data(KEY_META, e))?;
        Ok(Some(parsed))
    }

    pub fn put_meta(&self, meta: &LogMeta) -> Result<(), StorageError> {
        let value = serde_json::to_vec(meta).map_err(|e| to_storage_data(KEY_META, e))?;
        self.meta.insert(KEY_META, value).map_err(to_storage_io)?;
        Ok(())
    }

    pub fn append_event(&self, event: &StatusEvent) -> Result<(), StorageError> {
        let key = event.seq.to_be_bytes();
        let value = serde_json::to_vec(event).map_err(|e| to_storage_data(&key, e))?;
        self.events
            .insert(key, value)
            .map_err(to_storage_io)?;
        Ok(())
    }

    /// Events with `seq > after_seq`, oldest first.
    pub fn read_events_after(&self, after_seq: u64) -> Result<Vec<StatusEvent>, StorageError> {
        let start = after_seq.saturating_add(1).to_be_bytes();
        let mut out = Vec::new();
        for result in self.events.range(start..) {
            let (key, value) = result.map_err(to_storage_io)?;
            out.push(serde_json::from_slice(&value).map_err(|e| to_storage_data(&key, e))?);
        }
        Ok(out)
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush().map_err(to_storage_io)?;
        Ok(())
    }
}

fn to_storage_io(err: sled::Error) -> StorageError {
    StorageError::IoError(io::Error::new(io::ErrorKind::Other, err.to_string()))
}

/// Event keys are big-endian sequence numbers and are reported as such.
fn to_storage_data(key: &[u8], err: serde_json::Error) -> StorageError {
    let key = match <[u8; 8]>::try_from(key) {
        Ok(seq) => format!("status_events/{}", u64::from_be_bytes(seq)),
        Err(_) => String::from_utf8_lossy(key).into_owned(),
    };
    StorageError::Corrupt {
        key,
        reason: err.to_string(),
    }
}
