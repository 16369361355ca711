//! Named waits of the generation workflow.

use std::time::Duration;

use crate::client::ClientTimings;
use crate::config::TimingsConfig;

#[derive(Debug, Clone, Copy)]
pub struct Timings {
    pub client: ClientTimings,
    /// Wait between attaching a source and invoking the tool.
    pub ingestion_grace: Duration,
    /// Wait between consecutive queue items.
    pub item_pacing: Duration,
}

impl Timings {
    pub fn from_config(config: &TimingsConfig) -> Self {
        Self {
            client: ClientTimings {
                source_grace: Duration::from_millis(config.source_grace_ms),
                poll_interval: Duration::from_millis(config.poll_interval_ms),
                poll_attempts: config.poll_attempts,
            },
            ingestion_grace: Duration::from_millis(config.ingestion_grace_ms),
            item_pacing: Duration::from_millis(config.item_pacing_ms),
        }
    }

    /// No waiting at all; the poll budget is unchanged.
    pub fn immediate() -> Self {
        Self {
            client: ClientTimings {
                source_grace: Duration::ZERO,
                poll_interval: Duration::ZERO,
                poll_attempts: ClientTimings::default().poll_attempts,
            },
            ingestion_grace: Duration::ZERO,
            item_pacing: Duration::ZERO,
        }
    }

    pub fn with_poll_attempts(mut self, attempts: u32) -> Self {
        self.client.poll_attempts = attempts;
        self
    }
}

impl Default for Timings {
    fn default() -> Self {
        Self::from_config(&TimingsConfig::default())
    }
}
