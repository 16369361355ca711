//! Configuration loading entry point.

use super::merge::builder_with_defaults;
use super::sources::{global_file, workspace_file};
use super::InfogenConfig;
use crate::error::ApiError;
use config::{Environment, File};
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load the layered configuration for `workspace_root`.
    ///
    /// Precedence, lowest first: defaults, global file, workspace files, `INFOGEN__*` env.
    pub fn load(workspace_root: &Path) -> Result<InfogenConfig, ApiError> {
        let builder = builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let config = builder
            .add_source(Self::environment())
            .build()?
            .try_deserialize::<InfogenConfig>()?;
        debug!(workspace = %workspace_root.display(), "configuration loaded");
        Self::validated(config)
    }

    /// Load a single file on top of the defaults, ignoring the layered lookup.
    pub fn load_from_file(path: &Path) -> Result<InfogenConfig, ApiError> {
        if !path.exists() {
            return Err(ApiError::ConfigError(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let config = builder_with_defaults()?
            .add_source(File::from(path.to_path_buf()))
            .build()?
            .try_deserialize::<InfogenConfig>()?;
        Self::validated(config)
    }

    pub fn global_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }

    fn environment() -> Environment {
        Environment::with_prefix("INFOGEN")
            .separator("__")
            .try_parsing(true)
    }

    fn validated(config: InfogenConfig) -> Result<InfogenConfig, ApiError> {
        config.validate().map_err(|errors| {
            ApiError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                errors.join("\n")
            ))
        })?;
        Ok(config)
    }
}
