//! Configuration System
//!
//! Layered configuration for generation runs: merge-policy defaults, the
//! user's global file, workspace files, then CLI flags applied by the caller.
//! An explicit `--config` file replaces the file layers.

use crate::grouping::{GroupingPolicy, OutputNaming};
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::global_file::global_config_path;

/// Name of the store sub-directory holding the sled context database.
pub const CONTEXTS_DIR: &str = "contexts";

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KilnConfig {
    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Defaults for `kiln generate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Where outputs land; relative paths resolve against the workspace
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,

    /// File-name segment marking templates (`page.tmpl.html`)
    #[serde(default = "default_template_marker")]
    pub template_marker: String,

    #[serde(default)]
    pub preserve_structure: bool,

    #[serde(default)]
    pub ignore_errors: bool,

    #[serde(default)]
    pub policy: GroupingPolicy,

    /// Run per-item units in parallel
    #[serde(default = "default_true")]
    pub parallel: bool,

    /// Worker threads when parallel; 0 lets rayon decide
    #[serde(default)]
    pub max_threads: usize,
}

fn default_output_root() -> PathBuf {
    PathBuf::from("generated")
}

fn default_template_marker() -> String {
    "tmpl".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            output_root: default_output_root(),
            template_marker: default_template_marker(),
            preserve_structure: false,
            ignore_errors: false,
            policy: GroupingPolicy::default(),
            parallel: default_true(),
            max_threads: 0,
        }
    }
}

impl GenerationConfig {
    /// Output naming for a workspace, with the output root made absolute.
    pub fn naming(&self, workspace_root: &Path) -> OutputNaming {
        OutputNaming {
            output_root: resolve_against(workspace_root, &self.output_root),
            preserve_structure: self.preserve_structure,
            template_marker: if self.template_marker.is_empty() {
                None
            } else {
                Some(self.template_marker.clone())
            },
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.output_root.as_os_str().is_empty() {
            return Err("output_root cannot be empty".to_string());
        }
        if self.template_marker.contains(['.', '/', '\\']) {
            return Err(format!(
                "template_marker '{}' must be a single file-name segment",
                self.template_marker
            ));
        }
        Ok(())
    }
}

/// Where persisted contexts live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,
}

fn default_store_dir() -> PathBuf {
    PathBuf::from(".kiln")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            store_dir: default_store_dir(),
        }
    }
}

impl StorageConfig {
    pub fn store_path(&self, workspace_root: &Path) -> PathBuf {
        resolve_against(workspace_root, &self.store_dir)
    }

    /// Location of the sled database.
    pub fn contexts_path(&self, workspace_root: &Path) -> PathBuf {
        self.store_path(workspace_root).join(CONTEXTS_DIR)
    }

    fn validate(&self) -> Result<(), String> {
        if self.store_dir.as_os_str().is_empty() {
            return Err("store_dir cannot be empty".to_string());
        }
        Ok(())
    }
}

fn resolve_against(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Generation(String),
    Storage(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Generation(msg) => write!(f, "generation: {}", msg),
            ValidationError::Storage(msg) => write!(f, "storage: {}", msg),
            ValidationError::Logging(msg) => write!(f, "logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

impl KilnConfig {
    /// Validate the entire configuration, collecting every problem.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.generation.validate() {
            errors.push(ValidationError::Generation(e));
        }
        if let Err(e) = self.storage.validate() {
            errors.push(ValidationError::Storage(e));
        }

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError::Logging(format!(
                "unknown level '{}'",
                self.logging.level
            )));
        }
        if !matches!(self.logging.format.as_str(), "text" | "json") {
            errors.push(ValidationError::Logging(format!(
                "unknown format '{}'",
                self.logging.format
            )));
        }
        if !matches!(self.logging.output.as_str(), "stdout" | "stderr" | "file") {
            errors.push(ValidationError::Logging(format!(
                "unknown output '{}'",
                self.logging.output
            )));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
