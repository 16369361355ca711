//! Generation orchestrator.
//!
//! Drives the notebook workflow for one unit or an ordered queue of units,
//! persisting every transition and publishing a notification for it. The
//! orchestrator is the only place failures are classified; callers always get
//! the original error back.

pub mod lock;
pub mod queue;
pub mod timings;
pub mod unit;

use std::sync::Arc;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::classify::{classify, Classification, FailureKind};
use crate::client::{SessionClient, Transport};
use crate::config::{ClientConfig, RetentionConfig};
use crate::error::ApiError;
use crate::notify::{NotificationRuntime, StatusEnvelope};
use crate::state::{
    now_millis, ArtifactRef, GenerationStatus, StatePatch, StateStore, UnitId,
};

pub use lock::{GlobalLock, LockGuard};
pub use queue::QueueOutcome;
pub use timings::Timings;
pub use unit::SingleOutcome;

pub struct Orchestrator {
    store: Arc<StateStore>,
    notifier: NotificationRuntime,
    transport: Arc<dyn Transport>,
    client_config: ClientConfig,
    retention: RetentionConfig,
    timings: Timings,
    lock: GlobalLock,
}

impl Orchestrator {
    pub fn new(
        store: Arc<StateStore>,
        notifier: NotificationRuntime,
        transport: Arc<dyn Transport>,
        client_config: ClientConfig,
        retention: RetentionConfig,
        timings: Timings,
    ) -> Self {
        let lock = GlobalLock::new(store.clone());
        Self {
            store,
            notifier,
            transport,
            client_config,
            retention,
            timings,
            lock,
        }
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    pub fn notifier(&self) -> &NotificationRuntime {
        &self.notifier
    }

    pub fn lock(&self) -> &GlobalLock {
        &self.lock
    }

    pub fn retention(&self) -> &RetentionConfig {
        &self.retention
    }

    /// A fresh session; sessions are never reused across runs.
    fn new_client(&self) -> SessionClient {
        SessionClient::new(
            self.transport.clone(),
            self.client_config.base_url.clone(),
            self.client_config.language.clone(),
            self.timings.client,
        )
    }

    /// Stamp a unit RUNNING, focus it and announce it. Returns the operation token.
    fn begin_unit(
        &self,
        unit_id: &UnitId,
        title: Option<String>,
        queue_progress: Option<String>,
    ) -> Result<u64, ApiError> {
        let token = now_millis();
        self.store
            .update_state(unit_id, StatePatch::running(token, title), token)?;
        self.store.set_focused(unit_id)?;
        let mut envelope = StatusEnvelope::unit(unit_id.clone(), GenerationStatus::Running);
        if let Some(progress) = queue_progress {
            envelope = envelope.with_queue_progress(progress);
        }
        self.notifier.emit_best_effort(envelope);
        Ok(token)
    }

    /// create → attach → ingestion grace → invoke → poll → materialize.
    async fn run_steps(
        &self,
        client: &mut SessionClient,
        unit_id: &UnitId,
        url: &str,
        notebook_title: &str,
    ) -> Result<ArtifactRef, ApiError> {
        let container_id = client.create_container(notebook_title).await?;
        debug!(unit_id = %unit_id, container_id = %container_id, "notebook created");

        let source_id = client.attach_source(&container_id, url).await?;
        debug!(unit_id = %unit_id, source_id = %source_id, "source attached");

        sleep(self.timings.ingestion_grace).await;

        let Some(operation_id) = client.invoke_tool(&container_id, &source_id).await? else {
            return Err(ApiError::LimitExceeded);
        };
        debug!(unit_id = %unit_id, operation_id = %operation_id, "generation started");

        let artifact_url = client.poll_for_artifact(&container_id, &operation_id).await?;
        self.materialize(client, unit_id, &artifact_url).await
    }

    /// Fetch and store the image. A failed fetch degrades to a URL-only reference.
    async fn materialize(
        &self,
        client: &SessionClient,
        unit_id: &UnitId,
        artifact_url: &str,
    ) -> Result<ArtifactRef, ApiError> {
        match client.download(artifact_url).await {
            Ok(response) => Ok(self.store.put_artifact(
                unit_id,
                artifact_url,
                response.content_type.clone(),
                &response.body,
            )?),
            Err(err) => {
                warn!(unit_id = %unit_id, error = %err, "artifact download failed, keeping URL only");
                Ok(ArtifactRef::url_only(artifact_url))
            }
        }
    }

    fn complete_unit(&self, unit_id: &UnitId, artifact: ArtifactRef) -> Result<(), ApiError> {
        self.store
            .update_state(unit_id, StatePatch::completed(artifact.clone()), now_millis())?;
        self.notifier.emit_best_effort(
            StatusEnvelope::unit(unit_id.clone(), GenerationStatus::Completed)
                .with_artifact(Some(artifact)),
        );
        Ok(())
    }

    /// Classify `err`, persist the matching terminal status and announce it.
    fn fail_unit(
        &self,
        unit_id: &UnitId,
        err: &ApiError,
        message_override: Option<&str>,
    ) -> Result<Classification, ApiError> {
        let mut classification = classify(&err.to_string());
        if let Some(message) = message_override {
            classification.message = message.to_string();
        }
        let status = failure_status(classification.kind);
        self.store.update_state(
            unit_id,
            StatePatch::failed(status, classification.message.clone()),
            now_millis(),
        )?;
        self.notifier.emit_best_effort(
            StatusEnvelope::unit(unit_id.clone(), status).with_error(classification.message.clone()),
        );
        Ok(classification)
    }
}

pub fn failure_status(kind: FailureKind) -> GenerationStatus {
    match kind {
        FailureKind::Auth => GenerationStatus::AuthRequired,
        FailureKind::Limit => GenerationStatus::LimitExceeded,
        _ => GenerationStatus::Failed,
    }
}
