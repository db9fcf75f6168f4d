//! Workspace config file sources: kiln.toml and config/{env}.toml

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::File;
use std::path::Path;

/// Workspace-level config file name.
pub const WORKSPACE_CONFIG_FILE: &str = "kiln.toml";

/// Add workspace config files to builder.
/// Precedence: kiln.toml (base) then config/{KILN_ENV}.toml (env-specific).
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let mut builder = builder;

    let base_config_path = workspace_root.join(WORKSPACE_CONFIG_FILE);
    if base_config_path.is_file() {
        builder = builder.add_source(File::from(base_config_path).required(false));
    }

    if let Ok(env_name) = std::env::var("KILN_ENV") {
        let env_config_path = workspace_root
            .join("config")
            .join(format!("{}.toml", env_name));
        if env_config_path.is_file() {
            builder = builder.add_source(File::from(env_config_path).required(false));
        }
    }

    Ok(builder)
}
