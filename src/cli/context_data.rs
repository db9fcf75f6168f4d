//! Caller-supplied context values for the placeholder generator.
//!
//! Built once per command, before any invocation context exists: the
//! `--context-file` object first, then `--context key=value` pairs on top.

use crate::error::ApiError;
use serde_json::{Map, Value};
use std::path::Path;

/// Parse `key=value` pairs. A key given more than once collects into an
/// array in argument order; a key given once stays a string.
pub fn parse_context_pairs(pairs: &[String]) -> Result<Map<String, Value>, ApiError> {
    let mut values = Map::new();
    for pair in pairs {
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            ApiError::InvalidInput(format!("context value '{}' is not KEY=VALUE", pair))
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(ApiError::InvalidInput(format!(
                "context value '{}' has an empty key",
                pair
            )));
        }

        let value = Value::String(value.to_string());
        match values.get_mut(key) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                values.insert(key.to_string(), value);
            }
        }
    }
    Ok(values)
}

/// Load a context file. `.toml` files are parsed as TOML, anything else as
/// JSON. The top level must be an object.
pub fn load_context_file(path: &Path) -> Result<Map<String, Value>, ApiError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        ApiError::InvalidInput(format!("Failed to read context file {:?}: {}", path, e))
    })?;

    let is_toml = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false);
    let value: Value = if is_toml {
        let parsed: toml::Value = toml::from_str(&text).map_err(|e| {
            ApiError::InvalidInput(format!("Invalid TOML in context file {:?}: {}", path, e))
        })?;
        serde_json::to_value(parsed).map_err(|e| {
            ApiError::InvalidInput(format!("Unsupported value in context file {:?}: {}", path, e))
        })?
    } else {
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidInput(format!("Invalid JSON in context file {:?}: {}", path, e))
        })?
    };

    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ApiError::InvalidInput(format!(
            "context file {:?} must contain an object at the top level",
            path
        ))),
    }
}

/// Merge the optional file and the pairs into one context object.
pub fn build_context(pairs: &[String], file: Option<&Path>) -> Result<Value, ApiError> {
    let mut values = match file {
        Some(path) => load_context_file(path)?,
        None => Map::new(),
    };
    for (key, value) in parse_context_pairs(pairs)? {
        values.insert(key, value);
    }
    Ok(Value::Object(values))
}
