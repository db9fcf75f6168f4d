//! Entry point for loading a `KilnConfig`.

use crate::config::merge::merge_policy;
use crate::config::sources::{global_file, workspace_file};
use crate::config::KilnConfig;
use config::{ConfigError, File};
use std::path::Path;
use tracing::debug;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults, then the global file, then workspace files.
    pub fn load(workspace_root: &Path) -> Result<KilnConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let config: KilnConfig = builder.build()?.try_deserialize()?;
        debug!(workspace = %workspace_root.display(), "Loaded layered configuration");
        Ok(config)
    }

    /// Defaults plus exactly one file. Global and workspace files are ignored.
    pub fn load_from_file(path: &Path) -> Result<KilnConfig, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        merge_policy::builder_with_defaults()?
            .add_source(File::from(path).required(true))
            .build()?
            .try_deserialize()
    }

    /// Explicit file when given, layered loading otherwise.
    pub fn resolve(workspace_root: &Path, explicit: Option<&Path>) -> Result<KilnConfig, ConfigError> {
        match explicit {
            Some(path) => Self::load_from_file(path),
            None => Self::load(workspace_root),
        }
    }
}
