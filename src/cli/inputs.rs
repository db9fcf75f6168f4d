//! Input expansion: directories become the template files beneath them.

use crate::error::ApiError;
use crate::grouping::output_file_name;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Expand declared inputs in argument order.
///
/// Files (and paths that do not exist, so the run reports them as
/// unreadable) pass through unchanged. Directories are walked in file-name
/// order, skipping hidden entries, and contribute every file whose name
/// carries the template marker (every file when no marker is set).
pub fn expand_inputs(declared: &[PathBuf], marker: Option<&str>) -> Result<Vec<PathBuf>, ApiError> {
    let mut expanded = Vec::new();
    for path in declared {
        if !path.is_dir() {
            expanded.push(path.clone());
            continue;
        }

        let before = expanded.len();
        let walker = WalkDir::new(path)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e));
        for entry in walker {
            let entry = entry.map_err(|e| {
                ApiError::InvalidInput(format!("Failed to walk {:?}: {}", path, e))
            })?;
            if entry.file_type().is_file() && carries_marker(entry.path(), marker) {
                expanded.push(entry.into_path());
            }
        }

        if expanded.len() == before {
            warn!(directory = %path.display(), "No templates found in directory");
        } else {
            debug!(
                directory = %path.display(),
                templates = expanded.len() - before,
                "Expanded directory input"
            );
        }
    }

    if expanded.is_empty() {
        return Err(ApiError::InvalidInput("no template inputs found".to_string()));
    }
    Ok(expanded)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

fn carries_marker(path: &Path, marker: Option<&str>) -> bool {
    match marker {
        Some(m) if !m.is_empty() => {
            let name = path.file_name().map(|n| n.to_os_string());
            let stripped = output_file_name(path, Some(m));
            name.is_some() && stripped.is_some() && stripped != name
        }
        _ => true,
    }
}
