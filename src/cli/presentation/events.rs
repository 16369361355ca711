//! Notification log presentation.

use super::shared::{styled_status, to_pretty_json};
use crate::error::ApiError;
use crate::notify::StatusEvent;

pub fn format_events_text(events: &[StatusEvent]) -> String {
    if events.is_empty() {
        return "No events.".to_string();
    }
    let mut out = String::new();
    for event in events {
        let target = event
            .unit_id
            .as_ref()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "*".to_string());
        out.push_str(&format!(
            "{:>6}  {}  {:<14} {}",
            event.seq,
            event.ts,
            target,
            styled_status(event.status.as_str())
        ));
        if let Some(progress) = &event.queue_progress {
            out.push_str(&format!("  [{}]", progress));
        }
        if let Some(error) = &event.error {
            out.push_str(&format!("  {}", error));
        }
        out.push('\n');
    }
    out
}

pub fn format_events_json(events: &[StatusEvent]) -> Result<String, ApiError> {
    to_pretty_json(events)
}
