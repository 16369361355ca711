//! Configuration System
//!
//! Layered configuration for the generator: built-in defaults, the global
//! `~/.config/infogen/config.toml`, workspace `config/` files, then `INFOGEN__*`
//! environment overrides.

use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InfogenConfig {
    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub timings: TimingsConfig,

    #[serde(default)]
    pub retention: RetentionConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Notebook service connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Interface language sent as `hl`
    #[serde(default = "default_language")]
    pub language: String,

    /// Raw `Cookie` header from the host's credential storage
    #[serde(default)]
    pub cookie: Option<String>,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://notebooklm.google.com".to_string()
}

fn default_language() -> String {
    "en-GB".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            language: default_language(),
            cookie: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Named waits of the generation workflow, in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingsConfig {
    #[serde(default = "default_source_grace_ms")]
    pub source_grace_ms: u64,

    #[serde(default = "default_ingestion_grace_ms")]
    pub ingestion_grace_ms: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_poll_attempts")]
    pub poll_attempts: u32,

    #[serde(default = "default_item_pacing_ms")]
    pub item_pacing_ms: u64,
}

fn default_source_grace_ms() -> u64 {
    4_000
}

fn default_ingestion_grace_ms() -> u64 {
    5_000
}

fn default_poll_interval_ms() -> u64 {
    2_000
}

fn default_poll_attempts() -> u32 {
    90
}

fn default_item_pacing_ms() -> u64 {
    3_000
}

impl Default for TimingsConfig {
    fn default() -> Self {
        Self {
            source_grace_ms: default_source_grace_ms(),
            ingestion_grace_ms: default_ingestion_grace_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            poll_attempts: default_poll_attempts(),
            item_pacing_ms: default_item_pacing_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Completed records are purged this long after `completed_at`
    #[serde(default = "default_completed_ttl_hours")]
    pub completed_ttl_hours: u64,

    /// RUNNING records older than this are reported as failed
    #[serde(default = "default_stale_running_minutes")]
    pub stale_running_minutes: u64,
}

fn default_completed_ttl_hours() -> u64 {
    48
}

fn default_stale_running_minutes() -> u64 {
    5
}

impl RetentionConfig {
    pub fn completed_ttl_ms(&self) -> u64 {
        self.completed_ttl_hours.saturating_mul(60 * 60 * 1000)
    }

    pub fn stale_after_ms(&self) -> u64 {
        self.stale_running_minutes.saturating_mul(60 * 1000)
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            completed_ttl_hours: default_completed_ttl_hours(),
            stale_running_minutes: default_stale_running_minutes(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// State database directory; defaults to the platform data directory
    #[serde(default)]
    pub store_path: Option<PathBuf>,
}

impl StorageConfig {
    /// Resolve the store directory. Relative paths are taken from `workspace_root`.
    pub fn resolve_store_path(&self, workspace_root: &std::path::Path) -> PathBuf {
        match &self.store_path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => workspace_root.join(path),
            None => directories::ProjectDirs::from("", "", "infogen")
                .map(|dirs| dirs.data_dir().join("store"))
                .unwrap_or_else(|| workspace_root.join(".infogen").join("store")),
        }
    }
}

impl InfogenConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        let base = self.client.base_url.trim();
        if base.is_empty() {
            errors.push("client.base_url cannot be empty".to_string());
        } else {
            match url::Url::parse(base) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {}
                Ok(url) => errors.push(format!(
                    "client.base_url must be http or https, got '{}'",
                    url.scheme()
                )),
                Err(e) => errors.push(format!("client.base_url is not a valid URL: {}", e)),
            }
        }

        if self.timings.poll_attempts == 0 {
            errors.push("timings.poll_attempts must be at least 1".to_string());
        }
        if self.retention.stale_running_minutes == 0 {
            errors.push("retention.stale_running_minutes must be at least 1".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
