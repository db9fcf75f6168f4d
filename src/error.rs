//! Error types for the kiln invocation framework.

use crate::types::GroupKey;
use std::path::PathBuf;
use thiserror::Error;

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        StorageError::Database(err.to_string())
    }
}

/// Failures of a single unit of work (or of context construction).
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("Input unreadable: {path:?}: {message}")]
    InputUnreadable { path: PathBuf, message: String },

    #[error("Metadata value for key '{key}' cannot be persisted or compared")]
    MetadataUnserializable { key: String },

    #[error("Render failed for {input}: {message}")]
    RenderFailure { input: String, message: String },

    #[error("Stored context for group {group_key} is corrupt: {message}")]
    StoreCorrupt { group_key: GroupKey, message: String },

    #[error("Failed to write output {path:?}: {message}")]
    OutputWriteFailure { path: PathBuf, message: String },

    #[error("Failed to record context for group {group_key}: {message}")]
    StoreWriteFailure { group_key: GroupKey, message: String },

    #[error("Invalid invocation context: {0}")]
    InvalidContext(String),
}

impl GenerationError {
    pub fn is_render_failure(&self) -> bool {
        matches!(self, GenerationError::RenderFailure { .. })
    }

    /// Short category label used in run summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::InputUnreadable { .. } => "input-unreadable",
            GenerationError::MetadataUnserializable { .. } => "metadata-unserializable",
            GenerationError::RenderFailure { .. } => "render-failure",
            GenerationError::StoreCorrupt { .. } => "store-corrupt",
            GenerationError::OutputWriteFailure { .. } => "output-write-failure",
            GenerationError::StoreWriteFailure { .. } => "store-write-failure",
            GenerationError::InvalidContext(_) => "invalid-context",
        }
    }
}

/// Top-level errors for library callers and the CLI
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Generation error: {0}")]
    GenerationError(#[from] GenerationError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Planning failed: {0}")]
    PlanningFailed(String),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
