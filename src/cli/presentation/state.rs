//! Unit state presentation: status, gallery, single-run and sweep results.

use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use serde::Serialize;

use super::shared::{format_millis, format_section_heading, styled_status, to_pretty_json};
use crate::error::ApiError;
use crate::orchestrator::SingleOutcome;
use crate::state::{ArtifactRef, GenerationState, LockRecord, SweepReport, UnitId};

/// What `infogen status` shows.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub focused: Option<UnitId>,
    pub unit: Option<GenerationState>,
    pub lock: Option<LockRecord>,
    pub queue_progress: Option<String>,
}

pub fn format_status_text(report: &StatusReport) -> String {
    let mut out = format!("{}\n\n", format_section_heading("Generation Status"));
    match &report.unit {
        Some(state) => {
            out.push_str(&format!("  Unit: {}\n", state.unit_id));
            if let Some(title) = &state.title {
                out.push_str(&format!("  Title: {}\n", title));
            }
            out.push_str(&format!("  Status: {}\n", styled_status(state.status.as_str())));
            if let Some(artifact) = state.artifact() {
                out.push_str(&format!("  Artifact: {}\n", describe_artifact(artifact)));
            }
            if let Some(error) = state.error() {
                out.push_str(&format!("  Error: {}\n", error));
            }
            if let Some(at) = state.completed_at {
                out.push_str(&format!("  Completed: {}\n", format_millis(at)));
            }
            out.push_str(&format!("  Updated: {}\n", format_millis(state.updated_at)));
        }
        None => match &report.focused {
            Some(unit) => out.push_str(&format!("  Unit: {} (no record)\n", unit)),
            None => out.push_str("  No unit focused.\n"),
        },
    }
    out.push('\n');
    match &report.lock {
        Some(lock) => out.push_str(&format!(
            "  Lock: held by {} run since {}\n",
            lock.holder,
            format_millis(lock.acquired_at)
        )),
        None => out.push_str("  Lock: free\n"),
    }
    if let Some(progress) = &report.queue_progress {
        out.push_str(&format!("  Queue: {}\n", progress));
    }
    out
}

pub fn format_status_json(report: &StatusReport) -> Result<String, ApiError> {
    to_pretty_json(report)
}

pub fn format_gallery_text(states: &[GenerationState]) -> String {
    if states.is_empty() {
        return "No completed infographics.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Unit", "Title", "Completed", "Artifact"]);
    for state in states {
        table.add_row(vec![
            state.unit_id.to_string(),
            state.title.clone().unwrap_or_default(),
            state.completed_at.map(format_millis).unwrap_or_default(),
            state.artifact().map(describe_artifact).unwrap_or_default(),
        ]);
    }
    format!(
        "{}\n\n{}\n\nTotal: {} infographic(s)",
        format_section_heading("Gallery"),
        table,
        states.len()
    )
}

pub fn format_gallery_json(states: &[GenerationState]) -> Result<String, ApiError> {
    to_pretty_json(states)
}

pub fn format_single_outcome(outcome: &SingleOutcome) -> String {
    format!(
        "Infographic ready for {}\n  {}",
        outcome.unit_id,
        describe_artifact(&outcome.artifact)
    )
}

pub fn format_sweep_result(report: &SweepReport, purged: usize) -> String {
    let mut out = format!(
        "Interrupted runs failed: {}\nExpired results purged: {}\n",
        report.interrupted.len(),
        purged
    );
    for unit in &report.interrupted {
        out.push_str(&format!("  {}\n", unit));
    }
    if report.lock_cleared {
        out.push_str("Stale lock cleared.\n");
    }
    out
}

fn describe_artifact(artifact: &ArtifactRef) -> String {
    if artifact.has_blob() {
        format!("{} ({} bytes stored)", artifact.source_url, artifact.byte_len)
    } else {
        format!("{} (not stored)", artifact.source_url)
    }
}
