//! Single-unit generation.

use serde::Serialize;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::orchestrator::Orchestrator;
use crate::state::{ArtifactRef, LockScope, UnitId};

const DEFAULT_NOTEBOOK_TITLE: &str = "Infographic Gen";
pub const DAILY_LIMIT_MESSAGE: &str = "Your daily limit is over, try again after 24 hrs";

#[derive(Debug, Clone, Serialize)]
pub struct SingleOutcome {
    pub unit_id: UnitId,
    pub artifact: ArtifactRef,
}

impl Orchestrator {
    /// Generate an infographic for one URL.
    ///
    /// On failure the classified status is persisted and the original error returned.
    pub async fn generate_single(
        &self,
        url: &str,
        title: Option<String>,
    ) -> Result<SingleOutcome, ApiError> {
        let unit_id = UnitId::from_url(url)?;
        let guard = self.lock.try_acquire(LockScope::Single)?;
        info!(unit_id = %unit_id, url = %url, "starting generation");

        let notebook_title = title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_NOTEBOOK_TITLE.to_string());
        self.begin_unit(&unit_id, title, None)?;

        let mut client = self.new_client();
        let result = match client.initialize().await {
            Ok(()) => {
                self.run_steps(&mut client, &unit_id, url, &notebook_title)
                    .await
            }
            Err(err) => Err(err),
        };

        let outcome = match result {
            Ok(artifact) => {
                self.complete_unit(&unit_id, artifact.clone())?;
                info!(unit_id = %unit_id, bytes = artifact.byte_len, "generation completed");
                Ok(SingleOutcome { unit_id, artifact })
            }
            Err(err) => {
                // A declined invocation gets the quota wording rather than the generic one.
                let message = matches!(err, ApiError::LimitExceeded).then_some(DAILY_LIMIT_MESSAGE);
                let classification = self.fail_unit(&unit_id, &err, message)?;
                warn!(
                    unit_id = %unit_id,
                    kind = ?classification.kind,
                    error = %err,
                    "generation failed"
                );
                Err(err)
            }
        };
        guard.release()?;
        outcome
    }
}
