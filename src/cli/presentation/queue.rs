//! Queue presentation: list and run outcome.

use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;

use super::shared::{format_section_heading, styled_status, to_pretty_json};
use crate::error::ApiError;
use crate::orchestrator::QueueOutcome;
use crate::state::{QueueItem, QueueItemStatus};

fn item_status(status: QueueItemStatus) -> &'static str {
    match status {
        QueueItemStatus::Pending => "PENDING",
        QueueItemStatus::Running => "RUNNING",
        QueueItemStatus::Completed => "COMPLETED",
        QueueItemStatus::Failed => "FAILED",
    }
}

pub fn format_queue_text(items: &[QueueItem], progress: Option<&str>) -> String {
    if items.is_empty() {
        return "Queue is empty.\n\nUse 'infogen queue add <url>' to add one.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["#", "Unit", "Title", "Status", "Detail"]);
    for (index, item) in items.iter().enumerate() {
        let detail = item
            .error
            .clone()
            .or_else(|| item.artifact.as_ref().map(|a| a.source_url.clone()))
            .unwrap_or_default();
        table.add_row(vec![
            index.to_string(),
            item.unit_id.to_string(),
            item.title.clone().unwrap_or_default(),
            styled_status(item_status(item.status)),
            detail,
        ]);
    }
    let mut out = format!("{}\n\n{}\n", format_section_heading("Queue"), table);
    if let Some(progress) = progress {
        out.push_str(&format!("\n{}\n", progress));
    }
    out
}

pub fn format_queue_json(items: &[QueueItem]) -> Result<String, ApiError> {
    to_pretty_json(items)
}

pub fn format_queue_outcome(outcome: &QueueOutcome) -> String {
    let mut out = format!(
        "Queue finished: {} completed, {} failed",
        outcome.completed.len(),
        outcome.failed.len()
    );
    if let Some(kind) = outcome.halted_by {
        out.push_str(&format!(
            "\nStopped early ({:?}); {} item(s) left pending",
            kind, outcome.skipped
        ));
    }
    for (unit, message) in &outcome.failed {
        out.push_str(&format!("\n  {}: {}", unit, message));
    }
    out
}
