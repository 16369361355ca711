//! Sequential queue generation.

use serde::Serialize;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::classify::{classify, Classification, FailureKind};
use crate::client::SessionClient;
use crate::error::ApiError;
use crate::notify::StatusEnvelope;
use crate::orchestrator::{LockGuard, Orchestrator};
use crate::state::{GenerationStatus, LockScope, QueueEntry, UnitId};

const DEFAULT_ITEM_TITLE: &str = "Untitled Video";
const LABEL_TITLE_CHARS: usize = 20;

#[derive(Debug, Clone, Default, Serialize)]
pub struct QueueOutcome {
    pub completed: Vec<UnitId>,
    pub failed: Vec<(UnitId, String)>,
    /// Set when a systemic failure stopped the run early.
    pub halted_by: Option<FailureKind>,
    /// Items never attempted because of the halt.
    pub skipped: usize,
}

impl QueueOutcome {
    pub fn attempted(&self) -> usize {
        self.completed.len() + self.failed.len()
    }
}

impl Orchestrator {
    /// Run the stored queue front to back.
    pub async fn run_queue(&self) -> Result<QueueOutcome, ApiError> {
        let entries = self.store.queue_entries()?;
        self.generate_queue(&entries).await
    }

    /// Generate every item in order, one session for the whole run.
    ///
    /// Auth and limit failures stop the run; any other failure only fails its item.
    /// A failure of the run itself is broadcast globally before it is returned.
    pub async fn generate_queue(&self, items: &[QueueEntry]) -> Result<QueueOutcome, ApiError> {
        if items.is_empty() {
            return Ok(QueueOutcome::default());
        }
        let guard = self.lock.try_acquire(LockScope::Queue)?;
        info!(items = items.len(), "queue started");
        self.notifier
            .emit_best_effort(StatusEnvelope::global(GenerationStatus::Running));

        let mut client = self.new_client();
        let result = match client.initialize().await {
            Ok(()) => self.process_items(&mut client, items).await,
            Err(err) => {
                warn!(error = %err, "queue aborted before the first item");
                Err(err)
            }
        };

        let result = match result {
            Ok(outcome) => self.finish_queue(guard).map(|()| outcome),
            Err(err) => {
                if let Err(cleanup) = self.finish_queue(guard) {
                    warn!(error = %cleanup, "queue cleanup failed");
                }
                Err(err)
            }
        };

        match result {
            Ok(outcome) => {
                info!(
                    completed = outcome.completed.len(),
                    failed = outcome.failed.len(),
                    halted_by = ?outcome.halted_by,
                    "queue finished"
                );
                Ok(outcome)
            }
            Err(err) => {
                let message = classify(&err.to_string()).message;
                self.notifier.emit_best_effort(
                    StatusEnvelope::global(GenerationStatus::Failed).with_error(message),
                );
                Err(err)
            }
        }
    }

    /// Clear the progress label and release the queue lock.
    fn finish_queue(&self, guard: LockGuard) -> Result<(), ApiError> {
        self.store.set_progress_label(None)?;
        guard.release()
    }

    async fn process_items(
        &self,
        client: &mut SessionClient,
        items: &[QueueEntry],
    ) -> Result<QueueOutcome, ApiError> {
        let total = items.len();
        let mut outcome = QueueOutcome::default();

        for (index, item) in items.iter().enumerate() {
            let position = index + 1;
            let title = item
                .title
                .clone()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_ITEM_TITLE.to_string());
            let short: String = title.chars().take(LABEL_TITLE_CHARS).collect();
            self.store.set_progress_label(Some(&format!(
                "Processing {}/{}: {}...",
                position, total, short
            )))?;
            info!(unit_id = %item.unit_id, position, total, "queue item started");

            let token = self.begin_unit(
                &item.unit_id,
                Some(title.clone()),
                Some(format!("Processing {} of {}", position, total)),
            )?;

            match self.attempt_item(client, item, token, &title).await {
                Ok(Ok(())) => outcome.completed.push(item.unit_id.clone()),
                Ok(Err(classification)) => {
                    outcome
                        .failed
                        .push((item.unit_id.clone(), classification.message));
                    if classification.kind.is_systemic() {
                        warn!(kind = ?classification.kind, "stopping queue");
                        outcome.halted_by = Some(classification.kind);
                        outcome.skipped = total - position;
                        break;
                    }
                }
                Err(err) => {
                    // The item is RUNNING; try to settle it before giving up on the run.
                    if let Err(store_err) = self.fail_unit(&item.unit_id, &err, None) {
                        warn!(unit_id = %item.unit_id, error = %store_err, "could not fail queue item");
                    }
                    return Err(err);
                }
            }

            if position < total {
                sleep(self.timings.item_pacing).await;
            }
        }
        Ok(outcome)
    }

    /// Run one started item to a terminal state. The outer error is a failure of
    /// the run itself; the inner one is the item's own classified failure.
    async fn attempt_item(
        &self,
        client: &mut SessionClient,
        item: &QueueEntry,
        token: u64,
        title: &str,
    ) -> Result<Result<(), Classification>, ApiError> {
        self.store.mark_queue_attempt(&item.unit_id, token)?;

        let notebook_title = format!("Infographic: {}", title);
        match self
            .run_steps(client, &item.unit_id, &item.url, &notebook_title)
            .await
        {
            Ok(artifact) => {
                self.complete_unit(&item.unit_id, artifact)?;
                Ok(Ok(()))
            }
            Err(err) => {
                let classification = self.fail_unit(&item.unit_id, &err, None)?;
                warn!(
                    unit_id = %item.unit_id,
                    kind = ?classification.kind,
                    error = %err,
                    "queue item failed"
                );
                Ok(Err(classification))
            }
        }
    }
}
