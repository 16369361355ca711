//! Event ingestion and sequence assignment.

use std::sync::{mpsc::Receiver, Arc};

use parking_lot::Mutex;

use crate::error::StorageError;
use crate::notify::log::{EventLog, LogMeta};
use crate::notify::{StatusEnvelope, StatusEvent};
use crate::state::now_millis;

pub struct EventIngestor {
    log: Arc<EventLog>,
    receiver: Receiver<StatusEnvelope>,
}

impl EventIngestor {
    pub fn new(log: Arc<EventLog>, receiver: Receiver<StatusEnvelope>) -> Self {
        Self { log, receiver }
    }

    /// Persist everything waiting on the bus. Returns the last assigned seq, if any.
    pub fn ingest_pending(&mut self) -> Result<Option<u64>, StorageError> {
        let mut last = None;
        while let Ok(envelope) = self.receiver.try_recv() {
            last = Some(self.ingest_one(envelope)?);
        }
        Ok(last)
    }

    fn ingest_one(&self, envelope: StatusEnvelope) -> Result<u64, StorageError> {
        let mut meta = self.log.get_meta()?.unwrap_or(LogMeta {
            next_seq: 1,
            updated_at_ms: now_millis(),
        });
        let seq = meta.next_seq;
        self.log.append_event(&StatusEvent::from_envelope(envelope, seq))?;
        meta.next_seq += 1;
        meta.updated_at_ms = now_millis();
        self.log.put_meta(&meta)?;
        Ok(seq)
    }
}

#[derive(Clone)]
pub struct SharedIngestor(Arc<Mutex<EventIngestor>>);

impl SharedIngestor {
    pub fn new(inner: EventIngestor) -> Self {
        Self(Arc::new(Mutex::new(inner)))
    }

    pub fn drain(&self) -> Result<Option<u64>, StorageError> {
        self.0.lock().ingest_pending()
    }
}
