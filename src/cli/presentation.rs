//! CLI presentation: text and json formatters per command family.

mod events;
mod queue;
mod shared;
mod state;

pub use events::{format_events_json, format_events_text};
pub use queue::{format_queue_json, format_queue_outcome, format_queue_text};
pub use shared::{format_section_heading, styled_status, to_pretty_json};
pub use state::{
    format_gallery_json, format_gallery_text, format_single_outcome, format_status_json,
    format_status_text, format_sweep_result, StatusReport,
};
