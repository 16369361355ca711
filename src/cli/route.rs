//! CLI route: single route table and run context. Dispatches to domain services and presentation.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::cli::parse::{Commands, QueueCommands};
use crate::cli::presentation::{
    format_events_json, format_events_text, format_gallery_json, format_gallery_text,
    format_queue_json, format_queue_outcome, format_queue_text, format_single_outcome,
    format_status_json, format_status_text, format_sweep_result, StatusReport,
};
use crate::client::{ReqwestTransport, Transport};
use crate::config::{ConfigLoader, InfogenConfig};
use crate::error::{ApiError, StorageError};
use crate::notify::NotificationRuntime;
use crate::orchestrator::{Orchestrator, Timings};
use crate::state::{now_millis, QueueEntry, StateStore, SweepReport, UnitId};

/// Runtime context for CLI execution: workspace, config and the orchestrator.
pub struct RunContext {
    workspace_root: PathBuf,
    config: InfogenConfig,
    orchestrator: Orchestrator,
    startup: (SweepReport, usize),
}

impl RunContext {
    /// Create run context from workspace root and optional config path.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };
        let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(&config.client)?);
        let timings = Timings::from_config(&config.timings);
        Self::with_transport(workspace_root, config, transport, timings)
    }

    /// Build a context over an explicit transport. Opening the store takes sled's
    /// directory lock, so the start-up sweep cannot race another driver.
    pub fn with_transport(
        workspace_root: PathBuf,
        config: InfogenConfig,
        transport: Arc<dyn Transport>,
        timings: Timings,
    ) -> Result<Self, ApiError> {
        let store_path = config.storage.resolve_store_path(&workspace_root);
        std::fs::create_dir_all(&store_path).map_err(StorageError::IoError)?;
        let store = Arc::new(StateStore::open(&store_path)?);
        let notifier = NotificationRuntime::new(store.db().clone())?;

        let orchestrator = Orchestrator::new(
            store,
            notifier,
            transport,
            config.client.clone(),
            config.retention.clone(),
            timings,
        );
        let startup = run_maintenance(&orchestrator)?;
        if !startup.0.interrupted.is_empty() || startup.1 > 0 {
            info!(
                interrupted = startup.0.interrupted.len(),
                purged = startup.1,
                "start-up maintenance"
            );
        }

        Ok(Self {
            workspace_root,
            config,
            orchestrator,
            startup,
        })
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn workspace_root(&self) -> &PathBuf {
        &self.workspace_root
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        let result = self.execute_inner(command);
        self.orchestrator.store().flush()?;
        result
    }

    fn execute_inner(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Generate { url, title } => {
                let outcome =
                    block_on(self.orchestrator.generate_single(url, title.clone()))??;
                Ok(format_single_outcome(&outcome))
            }
            Commands::Queue { command } => self.handle_queue_command(command),
            Commands::Status { unit, format } => {
                let report = self.status_report(unit.as_deref())?;
                if format == "json" {
                    format_status_json(&report)
                } else {
                    Ok(format_status_text(&report))
                }
            }
            Commands::Reset { unit, yes } => {
                let unit_id = resolve_unit(unit)?;
                if !*yes {
                    use dialoguer::Confirm;
                    let confirmed = Confirm::new()
                        .with_prompt(format!("Forget all state for '{}'?", unit_id))
                        .interact()
                        .map_err(|e| {
                            ApiError::ConfigError(format!("Failed to get user input: {}", e))
                        })?;
                    if !confirmed {
                        return Ok("Reset cancelled".to_string());
                    }
                }
                if self.orchestrator.store().reset_state(&unit_id)? {
                    Ok(format!("Reset {}", unit_id))
                } else {
                    Ok(format!("No state recorded for {}", unit_id))
                }
            }
            Commands::Gallery { format } => {
                let states = self.orchestrator.store().gallery()?;
                if format == "json" {
                    format_gallery_json(&states)
                } else {
                    Ok(format_gallery_text(&states))
                }
            }
            Commands::Export { unit, path } => {
                let unit_id = resolve_unit(unit)?;
                let Some((artifact, bytes)) = self.orchestrator.store().artifact_bytes(&unit_id)?
                else {
                    return Err(ApiError::ArtifactMissing(unit_id.to_string()));
                };
                std::fs::write(path, &bytes).map_err(StorageError::IoError)?;
                Ok(format!(
                    "Wrote {} bytes ({}) to {}",
                    bytes.len(),
                    artifact.content_type.as_deref().unwrap_or("unknown type"),
                    path.display()
                ))
            }
            Commands::Events { after, format } => {
                let events = self.orchestrator.notifier().read_events_after(*after)?;
                if format == "json" {
                    format_events_json(&events)
                } else {
                    Ok(format_events_text(&events))
                }
            }
            Commands::Sweep => {
                let (mut report, mut purged) = self.startup.clone();
                let (again, purged_again) = run_maintenance(&self.orchestrator)?;
                report.interrupted.extend(again.interrupted);
                report.lock_cleared |= again.lock_cleared;
                purged += purged_again;
                Ok(format_sweep_result(&report, purged))
            }
            Commands::Config => {
                let mut shown = self.config.clone();
                if shown.client.cookie.is_some() {
                    shown.client.cookie = Some("<redacted>".to_string());
                }
                toml::to_string_pretty(&shown)
                    .map_err(|e| ApiError::ConfigError(format!("Failed to render config: {}", e)))
            }
        }
    }

    fn handle_queue_command(&self, command: &QueueCommands) -> Result<String, ApiError> {
        let store = self.orchestrator.store();
        match command {
            QueueCommands::Add { url, title } => {
                let unit_id = UnitId::from_url(url)?;
                let entry = QueueEntry::new(unit_id.clone(), url.clone(), title.clone());
                if store.enqueue(entry)? {
                    Ok(format!("Queued {}", unit_id))
                } else {
                    Ok(format!("{} is already queued", unit_id))
                }
            }
            QueueCommands::Remove { index } => {
                let removed = store.remove_at(*index)?;
                Ok(format!("Removed {}", removed.unit_id))
            }
            QueueCommands::Clear => {
                let count = store.clear_queue()?;
                Ok(format!("Cleared {} queued item(s)", count))
            }
            QueueCommands::List { format } => {
                let items =
                    store.queue_view(now_millis(), self.config.retention.stale_after_ms())?;
                if format == "json" {
                    format_queue_json(&items)
                } else {
                    let progress = store.progress_label()?;
                    Ok(format_queue_text(&items, progress.as_deref()))
                }
            }
            QueueCommands::Run => {
                let outcome = block_on(self.orchestrator.run_queue())??;
                Ok(format_queue_outcome(&outcome))
            }
        }
    }

    fn status_report(&self, unit: Option<&str>) -> Result<StatusReport, ApiError> {
        let store = self.orchestrator.store();
        let focused = store.focused()?;
        let target = match unit {
            Some(raw) => Some(resolve_unit(raw)?),
            None => focused.clone(),
        };
        let state = match &target {
            Some(unit_id) => store.read_state(
                unit_id,
                now_millis(),
                self.config.retention.stale_after_ms(),
            )?,
            None => None,
        };
        Ok(StatusReport {
            focused: target.or(focused),
            unit: state,
            lock: store.lock_record()?,
            queue_progress: store.progress_label()?,
        })
    }
}

/// Fail abandoned runs and purge expired completions.
fn run_maintenance(orchestrator: &Orchestrator) -> Result<(SweepReport, usize), ApiError> {
    let store = orchestrator.store();
    let now = now_millis();
    let report = store.sweep_abandoned(now)?;
    let purged = store.purge_expired(now, orchestrator.retention().completed_ttl_ms())?;
    store.flush()?;
    Ok((report, purged))
}

/// Accept either a unit id or a source URL.
fn resolve_unit(raw: &str) -> Result<UnitId, ApiError> {
    if raw.contains("://") {
        UnitId::from_url(raw)
    } else {
        Ok(UnitId::new(raw))
    }
}

fn block_on<F: Future>(future: F) -> Result<F::Output, ApiError> {
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| ApiError::ConfigError(format!("Failed to create runtime: {}", e)))?;
    Ok(rt.block_on(future))
}
