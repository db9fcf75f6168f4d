//! Cleaner
//!
//! Removes generated outputs and their recorded contexts, bypassing staleness
//! entirely. After a clean the next run behaves like a first-ever run for
//! every affected group.

use crate::error::{ApiError, StorageError};
use crate::paths;
use crate::store::ContextStore;
use crate::types::GroupKey;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What a clean removed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanReport {
    pub removed_outputs: Vec<PathBuf>,
    pub removed_entries: Vec<GroupKey>,
    /// Plain files passed as locations and deleted
    pub removed_locations: Vec<PathBuf>,
    /// Entries that failed to decode and were dropped
    pub dropped_corrupt: usize,
}

impl CleanReport {
    pub fn is_empty(&self) -> bool {
        self.removed_outputs.is_empty()
            && self.removed_entries.is_empty()
            && self.removed_locations.is_empty()
            && self.dropped_corrupt == 0
    }
}

pub struct Cleaner {
    store: Arc<dyn ContextStore>,
}

impl Cleaner {
    pub fn new(store: Arc<dyn ContextStore>) -> Self {
        Self { store }
    }

    /// Delete every recorded group with an output equal to or under any of
    /// `locations`, then any location that is itself a plain file.
    ///
    /// Outputs already gone from disk are not an error.
    pub fn clean(&self, locations: &[PathBuf]) -> Result<CleanReport, ApiError> {
        let targets: Vec<PathBuf> = locations
            .iter()
            .map(|l| paths::resolve_identifier(l))
            .collect();
        let mut report = CleanReport::default();

        for listing in self.store.list()? {
            let entry = match listing.entry {
                Some(entry) => entry,
                None => {
                    warn!(group_key = %listing.group_key.short(), "Dropping undecodable context entry");
                    self.store.delete(&listing.group_key)?;
                    report.dropped_corrupt += 1;
                    continue;
                }
            };

            let outputs = entry.output_paths();
            let matched = outputs
                .iter()
                .any(|output| targets.iter().any(|target| is_within(output, target)));
            if !matched {
                continue;
            }

            // Outputs first so an interrupted clean still leaves the entry
            // pointing at missing files, which reads as NewOutput.
            for output in outputs {
                if remove_file_if_present(&output)? {
                    debug!(output = %output.display(), "Removed output");
                    report.removed_outputs.push(output);
                }
            }
            self.store.delete(&listing.group_key)?;
            report.removed_entries.push(listing.group_key);
        }

        for target in &targets {
            if target.is_file() && remove_file_if_present(target)? {
                report.removed_locations.push(target.clone());
            }
        }

        info!(
            outputs = report.removed_outputs.len(),
            entries = report.removed_entries.len(),
            locations = report.removed_locations.len(),
            corrupt = report.dropped_corrupt,
            "Clean finished"
        );
        Ok(report)
    }
}

fn is_within(path: &Path, location: &Path) -> bool {
    path == location || path.starts_with(location)
}

fn remove_file_if_present(path: &Path) -> Result<bool, StorageError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StorageError::IoError(e)),
    }
}
