//! Durable generation state: per-unit records, focus pointer, queue, artifacts.

pub mod store;
pub mod types;

pub use store::{StateStore, SweepReport, STALE_MESSAGE};
pub use types::{
    now_millis, ArtifactRef, GenerationState, GenerationStatus, LockRecord, LockScope,
    QueueEntry, QueueItem, QueueItemStatus, StatePatch, UnitId,
};
