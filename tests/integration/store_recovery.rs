//! Persistence across restarts: staleness, sweeping abandoned runs, expiry.

use infogen::state::{
    now_millis, ArtifactRef, GenerationStatus, LockScope, StatePatch, StateStore, UnitId,
    STALE_MESSAGE,
};
use infogen::error::StorageError;
use std::sync::Arc;
use tempfile::TempDir;

const MINUTE: u64 = 60 * 1000;
const HOUR: u64 = 60 * MINUTE;

#[test]
fn test_state_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let unit = UnitId::new("abc");
    {
        let store = StateStore::open(dir.path()).unwrap();
        store
            .update_state(&unit, StatePatch::running(1_000, Some("Talk".into())), 1_000)
            .unwrap();
        store
            .update_state(&unit, StatePatch::completed(ArtifactRef::url_only("https://img/1")), 2_000)
            .unwrap();
        store.set_focused(&unit).unwrap();
        store.flush().unwrap();
    }
    let store = StateStore::open(dir.path()).unwrap();
    let state = store.get_state(&unit).unwrap().unwrap();
    assert_eq!(state.status, GenerationStatus::Completed);
    assert_eq!(state.title.as_deref(), Some("Talk"));
    assert_eq!(store.focused().unwrap(), Some(unit));
}

#[test]
fn test_store_is_single_writer() {
    let dir = TempDir::new().unwrap();
    let _first = StateStore::open(dir.path()).unwrap();
    match StateStore::open(dir.path()) {
        Err(StorageError::Locked(_)) | Err(StorageError::IoError(_)) => {}
        Ok(_) => panic!("second open should fail while the first is alive"),
        Err(other) => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_stale_running_record_fails_on_read() {
    let dir = TempDir::new().unwrap();
    let store = StateStore::open(dir.path()).unwrap();
    let unit = UnitId::new("abc");
    let started = 10 * MINUTE;
    store
        .update_state(&unit, StatePatch::running(started, None), started)
        .unwrap();

    let fresh = store
        .read_state(&unit, started + 4 * MINUTE, 5 * MINUTE)
        .unwrap()
        .unwrap();
    assert_eq!(fresh.status, GenerationStatus::Running);

    let stale = store
        .read_state(&unit, started + 6 * MINUTE, 5 * MINUTE)
        .unwrap()
        .unwrap();
    assert_eq!(stale.status, GenerationStatus::Failed);
    assert_eq!(stale.error(), Some(STALE_MESSAGE));

    // Correction is persisted, not just reported.
    let raw = store.get_state(&unit).unwrap().unwrap();
    assert_eq!(raw.status, GenerationStatus::Failed);
}

#[test]
fn test_sweep_fails_abandoned_runs_and_clears_lock() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(StateStore::open(dir.path()).unwrap());
    let now = now_millis();
    let running = UnitId::new("running");
    let done = UnitId::new("done");
    store
        .update_state(&running, StatePatch::running(now, None), now)
        .unwrap();
    store
        .update_state(&done, StatePatch::completed(ArtifactRef::url_only("https://img/2")), now)
        .unwrap();
    store.set_progress_label(Some("Processing 1/2: clip...")).unwrap();

    let lock = infogen::orchestrator::GlobalLock::new(store.clone());
    let guard = lock.try_acquire(LockScope::Queue).unwrap();
    std::mem::forget(guard);
    assert!(store.lock_record().unwrap().is_some());

    let report = store.sweep_abandoned(now).unwrap();
    assert_eq!(report.interrupted, vec![running.clone()]);
    assert!(report.lock_cleared);
    assert!(store.lock_record().unwrap().is_none());
    assert!(store.progress_label().unwrap().is_none());

    let swept = store.get_state(&running).unwrap().unwrap();
    assert_eq!(swept.status, GenerationStatus::Failed);
    assert_eq!(
        store.get_state(&done).unwrap().unwrap().status,
        GenerationStatus::Completed
    );
}

#[test]
fn test_purge_removes_only_expired_completions() {
    let dir = TempDir::new().unwrap();
    let store = StateStore::open(dir.path()).unwrap();
    let now = 100 * HOUR;
    let old = UnitId::new("old");
    let recent = UnitId::new("recent");
    let failed = UnitId::new("failed");

    store
        .update_state(&old, StatePatch::running(now - 50 * HOUR, None), now - 50 * HOUR)
        .unwrap();
    store
        .put_artifact(&old, "https://img/old", Some("image/png".into()), b"old")
        .and_then(|artifact| {
            store.update_state(&old, StatePatch::completed(artifact), now - 49 * HOUR)
        })
        .unwrap();
    store
        .update_state(&recent, StatePatch::completed(ArtifactRef::url_only("https://img/r")), now - HOUR)
        .unwrap();
    store
        .update_state(
            &failed,
            StatePatch::failed(GenerationStatus::Failed, "boom"),
            now - 60 * HOUR,
        )
        .unwrap();

    let purged = store.purge_expired(now, 48 * HOUR).unwrap();
    assert_eq!(purged, 1);
    assert!(store.get_state(&old).unwrap().is_none());
    assert!(store.artifact_bytes(&old).unwrap().is_none());
    assert!(store.get_state(&recent).unwrap().is_some());
    assert!(store.get_state(&failed).unwrap().is_some());
}

#[test]
fn test_gallery_newest_first() {
    let dir = TempDir::new().unwrap();
    let store = StateStore::open(dir.path()).unwrap();
    for (id, at) in [("a", 1_000), ("b", 3_000), ("c", 2_000)] {
        store
            .update_state(
                &UnitId::new(id),
                StatePatch::completed(ArtifactRef::url_only(format!("https://img/{}", id))),
                at,
            )
            .unwrap();
    }
    store
        .update_state(
            &UnitId::new("d"),
            StatePatch::failed(GenerationStatus::Failed, "x"),
            4_000,
        )
        .unwrap();

    let ids: Vec<_> = store
        .gallery()
        .unwrap()
        .into_iter()
        .map(|s| s.unit_id.to_string())
        .collect();
    assert_eq!(ids, vec!["b", "c", "a"]);
}
