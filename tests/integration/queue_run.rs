//! Sequential queue runs: halting on systemic failures, continuing past the rest.

use crate::integration::support::{FakeService, Harness, Landing};
use infogen::classify::{FailureKind, AUTH_MESSAGE};
use infogen::error::{ApiError, StorageError};
use infogen::orchestrator::QueueOutcome;
use infogen::state::{
    now_millis, GenerationStatus, LockScope, QueueEntry, QueueItemStatus, UnitId,
};

const STALE_AFTER_MS: u64 = 5 * 60 * 1000;

fn entry(id: &str, title: Option<&str>) -> QueueEntry {
    QueueEntry::new(
        UnitId::new(id),
        format!("https://youtu.be/{}", id),
        title.map(str::to_string),
    )
}

fn enqueue_all(harness: &Harness, ids: &[&str]) {
    for id in ids {
        assert!(harness.store().enqueue(entry(id, Some("Clip"))).unwrap());
    }
}

fn statuses(harness: &Harness) -> Vec<QueueItemStatus> {
    harness
        .store()
        .queue_view(now_millis(), STALE_AFTER_MS)
        .unwrap()
        .into_iter()
        .map(|item| item.status)
        .collect()
}

#[tokio::test]
async fn test_queue_completes_every_item() {
    let harness = Harness::new(FakeService::default());
    enqueue_all(&harness, &["aaa", "bbb"]);

    let outcome = harness.orchestrator.run_queue().await.unwrap();
    assert_eq!(outcome.completed, vec![UnitId::new("aaa"), UnitId::new("bbb")]);
    assert!(outcome.failed.is_empty());
    assert_eq!(outcome.halted_by, None);
    assert_eq!(
        statuses(&harness),
        vec![QueueItemStatus::Completed, QueueItemStatus::Completed]
    );
    // One session serves the whole queue.
    assert_eq!(harness.service.count("GET landing"), 1);
    assert!(harness.store().progress_label().unwrap().is_none());
    assert!(harness.store().lock_record().unwrap().is_none());
}

#[tokio::test]
async fn test_limit_halts_queue_and_leaves_rest_pending() {
    let harness = Harness::new(FakeService::default().with_quota(1));
    enqueue_all(&harness, &["aaa", "bbb", "ccc"]);

    let outcome = harness.orchestrator.run_queue().await.unwrap();
    assert_eq!(outcome.completed, vec![UnitId::new("aaa")]);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.halted_by, Some(FailureKind::Limit));
    assert_eq!(outcome.skipped, 1);
    assert_eq!(outcome.attempted(), 2);

    assert_eq!(
        statuses(&harness),
        vec![
            QueueItemStatus::Completed,
            QueueItemStatus::Failed,
            QueueItemStatus::Pending
        ]
    );
    let limited = harness
        .store()
        .get_state(&UnitId::new("bbb"))
        .unwrap()
        .unwrap();
    assert_eq!(limited.status, GenerationStatus::LimitExceeded);
    assert!(harness.store().get_state(&UnitId::new("ccc")).unwrap().is_none());
    assert_eq!(harness.service.count("R7cb6c"), 2);
    assert!(harness.store().lock_record().unwrap().is_none());
    assert!(harness.store().progress_label().unwrap().is_none());
}

#[tokio::test]
async fn test_rejected_session_halts_queue_mid_run() {
    let service = FakeService {
        unauthorized_on: Some(("CCqFvf", 1)),
        ..FakeService::default()
    };
    let harness = Harness::new(service);
    enqueue_all(&harness, &["aaa", "bbb", "ccc"]);

    let outcome = harness.orchestrator.run_queue().await.unwrap();
    assert_eq!(outcome.completed, vec![UnitId::new("aaa")]);
    assert_eq!(
        outcome.failed,
        vec![(UnitId::new("bbb"), AUTH_MESSAGE.to_string())]
    );
    assert_eq!(outcome.halted_by, Some(FailureKind::Auth));
    assert_eq!(outcome.skipped, 1);

    let rejected = harness
        .store()
        .get_state(&UnitId::new("bbb"))
        .unwrap()
        .unwrap();
    assert_eq!(rejected.status, GenerationStatus::AuthRequired);
    assert_eq!(rejected.error(), Some(AUTH_MESSAGE));
    assert!(harness.store().get_state(&UnitId::new("ccc")).unwrap().is_none());
    assert_eq!(
        statuses(&harness),
        vec![
            QueueItemStatus::Completed,
            QueueItemStatus::Failed,
            QueueItemStatus::Pending
        ]
    );
    assert_eq!(harness.service.count("CCqFvf"), 2);
    assert!(harness.store().lock_record().unwrap().is_none());
    assert!(harness.store().progress_label().unwrap().is_none());
    // The queue is editable again once the run has stopped.
    assert!(harness.store().enqueue(entry("ddd", None)).unwrap());
}

#[tokio::test]
async fn test_storage_failure_mid_run_is_broadcast() {
    let harness = Harness::new(FakeService::default());
    let items = vec![entry("aaa", Some("Clip")), entry("bbb", Some("Clip"))];
    harness
        .store()
        .db()
        .open_tree("queue")
        .unwrap()
        .insert("entries", "not json")
        .unwrap();

    let err = harness.orchestrator.generate_queue(&items).await.unwrap_err();
    assert!(matches!(
        err,
        ApiError::StorageError(StorageError::Corrupt { .. })
    ));

    let state = harness
        .store()
        .get_state(&UnitId::new("aaa"))
        .unwrap()
        .unwrap();
    assert_eq!(state.status, GenerationStatus::Failed);
    assert!(harness.store().get_state(&UnitId::new("bbb")).unwrap().is_none());
    assert!(harness.store().lock_record().unwrap().is_none());
    assert!(harness.store().progress_label().unwrap().is_none());

    let events = harness.orchestrator.notifier().read_events_after(0).unwrap();
    let last = events.last().unwrap();
    assert!(last.is_global());
    assert_eq!(last.status, GenerationStatus::Failed);
    assert!(last.error.is_some());
}

#[tokio::test]
async fn test_source_failure_does_not_stop_queue() {
    let service = FakeService {
        rejected_sources: vec!["https://youtu.be/bbb".to_string()],
        ..FakeService::default()
    };
    let harness = Harness::new(service);
    enqueue_all(&harness, &["aaa", "bbb", "ccc"]);

    let outcome = harness.orchestrator.run_queue().await.unwrap();
    assert_eq!(outcome.completed, vec![UnitId::new("aaa"), UnitId::new("ccc")]);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].0, UnitId::new("bbb"));
    assert!(outcome.failed[0].1.contains("Could not add this source"));
    assert_eq!(outcome.halted_by, None);
    assert_eq!(
        statuses(&harness),
        vec![
            QueueItemStatus::Completed,
            QueueItemStatus::Failed,
            QueueItemStatus::Completed
        ]
    );
}

#[tokio::test]
async fn test_signed_out_queue_fails_before_first_item() {
    let service = FakeService {
        landing: Landing::LoginRedirect,
        ..FakeService::default()
    };
    let harness = Harness::new(service);
    enqueue_all(&harness, &["aaa", "bbb"]);

    let err = harness.orchestrator.run_queue().await.unwrap_err();
    assert!(matches!(err, ApiError::LoginRequired));
    assert_eq!(
        statuses(&harness),
        vec![QueueItemStatus::Pending, QueueItemStatus::Pending]
    );
    assert!(harness.store().lock_record().unwrap().is_none());

    let events = harness.orchestrator.notifier().read_events_after(0).unwrap();
    let last = events.last().unwrap();
    assert!(last.is_global());
    assert_eq!(last.status, GenerationStatus::Failed);
    assert_eq!(last.error.as_deref(), Some(AUTH_MESSAGE));
}

#[tokio::test]
async fn test_queue_notifications_carry_progress() {
    let harness = Harness::new(FakeService::default());
    enqueue_all(&harness, &["aaa", "bbb"]);
    harness.orchestrator.run_queue().await.unwrap();

    let events = harness.orchestrator.notifier().read_events_after(0).unwrap();
    assert!(events[0].is_global());
    assert_eq!(events[0].status, GenerationStatus::Running);
    let progress: Vec<_> = events
        .iter()
        .filter_map(|e| e.queue_progress.clone())
        .collect();
    assert_eq!(progress, vec!["Processing 1 of 2", "Processing 2 of 2"]);
}

#[tokio::test]
async fn test_untitled_items_get_default_title() {
    let harness = Harness::new(FakeService::default());
    harness.store().enqueue(entry("aaa", None)).unwrap();
    harness.orchestrator.run_queue().await.unwrap();
    let state = harness
        .store()
        .get_state(&UnitId::new("aaa"))
        .unwrap()
        .unwrap();
    assert_eq!(state.title.as_deref(), Some("Untitled Video"));
}

#[tokio::test]
async fn test_empty_queue_is_a_no_op() {
    let harness = Harness::new(FakeService::default());
    let outcome = harness.orchestrator.run_queue().await.unwrap();
    assert_eq!(outcome.attempted(), 0);
    assert!(harness.service.calls().is_empty());
}

#[tokio::test]
async fn test_queue_edits_rejected_while_running() {
    let harness = Harness::new(FakeService::default());
    enqueue_all(&harness, &["aaa"]);
    let guard = harness.orchestrator.lock().try_acquire(LockScope::Queue).unwrap();

    assert!(matches!(
        harness.store().enqueue(entry("bbb", None)),
        Err(ApiError::QueueLocked)
    ));
    assert!(matches!(
        harness.store().remove_at(0),
        Err(ApiError::QueueLocked)
    ));
    assert!(matches!(
        harness.store().clear_queue(),
        Err(ApiError::QueueLocked)
    ));
    assert!(matches!(
        harness.orchestrator.run_queue().await,
        Err(ApiError::Busy(_))
    ));

    guard.release().unwrap();
    assert_eq!(harness.store().clear_queue().unwrap(), 1);
}

#[tokio::test]
async fn test_single_run_does_not_lock_queue_edits() {
    let harness = Harness::new(FakeService::default());
    let _guard = harness.orchestrator.lock().try_acquire(LockScope::Single).unwrap();
    assert!(harness.store().enqueue(entry("aaa", None)).unwrap());
}

#[test]
fn test_queue_outcome_default_is_empty() {
    let outcome = QueueOutcome::default();
    assert_eq!(outcome.attempted(), 0);
    assert_eq!(outcome.skipped, 0);
}
