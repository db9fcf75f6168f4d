//! Global config file source: $XDG_CONFIG_HOME/kiln/config.toml or ~/.config/kiln/config.toml

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::File;
use directories::BaseDirs;
use std::path::PathBuf;
use tracing::debug;

/// Path to the global config file, whether or not it exists.
pub fn global_config_path() -> Option<PathBuf> {
    let config_home = match std::env::var_os("XDG_CONFIG_HOME") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => BaseDirs::new()?.home_dir().join(".config"),
    };
    Some(config_home.join("kiln").join("config.toml"))
}

/// Add the global config file to the builder if it exists.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let path = match global_config_path() {
        Some(path) => path,
        None => return Ok(builder),
    };
    if !path.is_file() {
        debug!(config_path = %path.display(), "No global configuration file");
        return Ok(builder);
    }
    Ok(builder.add_source(File::from(path).required(false)))
}
