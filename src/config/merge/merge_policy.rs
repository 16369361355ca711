//! Merge rules: defaults, override order, conflict handling.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("client.base_url", "https://notebooklm.google.com")?
        .set_default("client.language", "en-GB")?
        .set_default("timings.poll_attempts", 90_i64)?
        .set_default("retention.completed_ttl_hours", 48_i64)?
        .set_default("retention.stale_running_minutes", 5_i64)
}
