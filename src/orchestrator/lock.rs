//! Advisory global lock: at most one orchestration (single or queue) at a time.
//!
//! The lock record lives in the state store so other readers (status views,
//! queue editing) can see who holds it. Installation is a compare-and-swap,
//! and the guard releases on drop if not released explicitly.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::ApiError;
use crate::state::{now_millis, LockRecord, LockScope, StateStore};

#[derive(Clone)]
pub struct GlobalLock {
    store: Arc<StateStore>,
}

impl GlobalLock {
    pub fn new(store: Arc<StateStore>) -> Self {
        Self { store }
    }

    pub fn try_acquire(&self, scope: LockScope) -> Result<LockGuard, ApiError> {
        let record = LockRecord {
            holder: scope,
            acquired_at: now_millis(),
        };
        if let Some(current) = self.store.try_lock(&record)? {
            debug!(requested = %scope, holder = %current.holder, "global lock busy");
            return Err(ApiError::Busy(format!("{} run in progress", current.holder)));
        }
        debug!(scope = %scope, "global lock acquired");
        Ok(LockGuard {
            store: self.store.clone(),
            scope,
            released: false,
        })
    }

    pub fn holder(&self) -> Result<Option<LockRecord>, ApiError> {
        Ok(self.store.lock_record()?)
    }
}

pub struct LockGuard {
    store: Arc<StateStore>,
    scope: LockScope,
    released: bool,
}

impl LockGuard {
    pub fn scope(&self) -> LockScope {
        self.scope
    }

    pub fn release(mut self) -> Result<(), ApiError> {
        self.released = true;
        self.store.unlock()?;
        debug!(scope = %self.scope, "global lock released");
        Ok(())
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if !self.released {
            if let Err(err) = self.store.unlock() {
                warn!(scope = %self.scope, error = %err, "failed to release global lock");
            }
        }
    }
}
