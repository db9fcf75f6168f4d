//! Atomic output writes
//!
//! Every output is first written to a temporary file next to its destination
//! and only renamed into place once all outputs of the unit are staged. A
//! failure on any path drops the temporaries, so a crash or error never
//! leaves a half-written file under an output name.

use crate::error::GenerationError;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Outputs written to temporary files, waiting to be committed.
pub struct StagedOutputs {
    staged: Vec<(NamedTempFile, PathBuf)>,
}

impl StagedOutputs {
    /// Stage one buffer per output, positionally aligned.
    pub fn stage(outputs: &[PathBuf], contents: Vec<Vec<u8>>) -> Result<Self, GenerationError> {
        if outputs.len() != contents.len() {
            return Err(GenerationError::OutputWriteFailure {
                path: outputs.first().cloned().unwrap_or_default(),
                message: format!(
                    "generator produced {} buffer(s) for {} output(s)",
                    contents.len(),
                    outputs.len()
                ),
            });
        }

        let mut staged = Vec::with_capacity(outputs.len());
        for (path, bytes) in outputs.iter().zip(contents) {
            let temp = stage_one(path, &bytes)?;
            staged.push((temp, path.clone()));
        }
        Ok(Self { staged })
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Rename every staged file into place.
    pub fn commit(self) -> Result<(), GenerationError> {
        for (temp, path) in self.staged {
            temp.persist(&path)
                .map_err(|e| GenerationError::OutputWriteFailure {
                    path: path.clone(),
                    message: format!("Failed to rename temp file into place: {}", e.error),
                })?;
            debug!(output = %path.display(), "Committed output");
        }
        Ok(())
    }
}

fn stage_one(path: &Path, bytes: &[u8]) -> Result<NamedTempFile, GenerationError> {
    let write_failure = |message: String| GenerationError::OutputWriteFailure {
        path: path.to_path_buf(),
        message,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)
        .map_err(|e| write_failure(format!("Failed to create parent directory {:?}: {}", parent, e)))?;

    let mut temp = NamedTempFile::new_in(&parent)
        .map_err(|e| write_failure(format!("Failed to create temp file: {}", e)))?;
    temp.write_all(bytes)
        .map_err(|e| write_failure(format!("Failed to write temp file: {}", e)))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| write_failure(format!("Failed to sync temp file: {}", e)))?;
    Ok(temp)
}

/// Stage and commit in one step.
pub fn write_outputs(outputs: &[PathBuf], contents: Vec<Vec<u8>>) -> Result<(), GenerationError> {
    StagedOutputs::stage(outputs, contents)?.commit()
}

/// True when every output exists as a file.
pub fn all_outputs_exist(outputs: &[PathBuf]) -> bool {
    outputs.iter().all(|p| p.is_file())
}
