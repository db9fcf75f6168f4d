//! Logging System
//!
//! Structured logging on top of `tracing`. Level, format and destination come
//! from the `[logging]` config section, overridable through `KILN_LOG`,
//! `KILN_LOG_FORMAT` and `KILN_LOG_OUTPUT`. Logs go to stderr by default so
//! stdout stays free for run summaries.

use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Master switch; `false` installs no subscriber at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json, text
    #[serde(default = "default_format")]
    pub format: String,

    /// Output destination: stdout, stderr, file
    #[serde(default = "default_output")]
    pub output: String,

    /// Log file path when output is "file". Relative paths are resolved
    /// against the workspace store directory.
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Colored output (text format, terminal destinations only)
    #[serde(default = "default_true")]
    pub color: bool,

    /// Per-module levels, e.g. `kiln::store = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_output() -> String {
    "stderr".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            level: default_log_level(),
            format: default_format(),
            output: default_output(),
            file: None,
            color: default_true(),
            modules: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Destination {
    Stdout,
    Stderr,
    File,
}

/// Log file location for a workspace: `file` if absolute, else under the
/// store directory (default name `kiln.log`).
pub fn resolve_log_file_path(file: Option<&Path>, store_dir: &Path) -> PathBuf {
    match file {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => store_dir.join(path),
        None => store_dir.join("kiln.log"),
    }
}

/// Initialize the global subscriber
///
/// Priority order (highest to lowest):
/// 1. `KILN_LOG`, `KILN_LOG_FORMAT`, `KILN_LOG_OUTPUT`
/// 2. The passed config (already merged with CLI flags)
/// 3. Defaults
///
/// A second call in the same process is a no-op.
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<(), ApiError> {
    let defaults = LoggingConfig::default();
    let config = config.unwrap_or(&defaults);
    if !config.enabled {
        return Ok(());
    }

    let filter = build_env_filter(config)?;
    let format = determine_format(config)?;
    let destination = determine_destination(config)?;

    let (writer, ansi) = match destination {
        Destination::Stdout => (BoxMakeWriter::new(std::io::stdout), config.color),
        Destination::Stderr => (BoxMakeWriter::new(std::io::stderr), config.color),
        Destination::File => {
            let path = config
                .file
                .clone()
                .ok_or_else(|| ApiError::ConfigError("Log output 'file' requires logging.file".to_string()))?;
            (BoxMakeWriter::new(Arc::new(open_log_file(&path)?)), false)
        }
    };

    let registry = Registry::default().with(filter);
    let result = if format == "json" {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(writer),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(ansi)
                    .with_writer(writer),
            )
            .try_init()
    };

    // Already initialized (tests, embedding callers)
    if result.is_err() {
        tracing::debug!("Logging subscriber already installed");
    }
    Ok(())
}

fn open_log_file(path: &Path) -> Result<std::fs::File, ApiError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ApiError::ConfigError(format!("Failed to create log directory: {}", e)))?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| ApiError::ConfigError(format!("Failed to open log file {:?}: {}", path, e)))
}

fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter, ApiError> {
    if let Ok(filter) = EnvFilter::try_from_env("KILN_LOG") {
        return Ok(filter);
    }

    if config.level == "off" {
        return Ok(EnvFilter::new("off"));
    }

    let mut filter = EnvFilter::new(&config.level);
    for (module, level) in &config.modules {
        let directive = format!("{}={}", module, level);
        filter = filter.add_directive(
            directive
                .parse()
                .map_err(|e| ApiError::ConfigError(format!("Invalid log directive '{}': {}", directive, e)))?,
        );
    }
    Ok(filter)
}

fn determine_format(config: &LoggingConfig) -> Result<String, ApiError> {
    if let Ok(format) = std::env::var("KILN_LOG_FORMAT") {
        if format == "json" || format == "text" {
            return Ok(format);
        }
    }

    match config.format.as_str() {
        "json" | "text" => Ok(config.format.clone()),
        other => Err(ApiError::ConfigError(format!(
            "Invalid log format: {} (must be 'json' or 'text')",
            other
        ))),
    }
}

fn determine_destination(config: &LoggingConfig) -> Result<Destination, ApiError> {
    match std::env::var("KILN_LOG_OUTPUT") {
        Ok(output) => parse_destination(&output),
        Err(_) => parse_destination(&config.output),
    }
}

fn parse_destination(output: &str) -> Result<Destination, ApiError> {
    match output {
        "stdout" => Ok(Destination::Stdout),
        "stderr" => Ok(Destination::Stderr),
        "file" => Ok(Destination::File),
        _ => Err(ApiError::ConfigError(format!(
            "Invalid log output: {} (must be 'stdout', 'stderr' or 'file')",
            output
        ))),
    }
}
