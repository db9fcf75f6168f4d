//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::ApiError;

/// Map domain/service errors to a string for CLI output.
pub fn map_error(e: &ApiError) -> String {
    let category = match e {
        ApiError::ConfigError(_) => "config",
        ApiError::StorageError(_) => "storage",
        ApiError::GenerationError(_) => "generation",
        ApiError::InvalidInput(_) => "input",
        ApiError::PlanningFailed(_) => "planning",
    };
    format!("error[{}]: {}", category, e)
}

/// Serialize a value as pretty JSON for `--format json`.
pub fn to_json<T: serde::Serialize>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value).map_err(|e| {
        ApiError::StorageError(crate::error::StorageError::Serialization(e.to_string()))
    })
}
