//! Invocation Context
//!
//! An immutable snapshot of everything that determines a generation step's
//! outcome: input identities and their fingerprints, output identities, and
//! generator metadata. A fresh context is built on every invocation; the
//! persisted copy in the context store is what it gets compared against.

pub mod metadata;

pub use metadata::{Metadata, MetadataCallable, RawMetadata, RawValue};

use crate::error::GenerationError;
use crate::fingerprint::{compute_group_key, fingerprint_file, Fingerprint};
use crate::types::GroupKey;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub struct InvocationContext {
    inputs: Vec<PathBuf>,
    input_fingerprints: Vec<Fingerprint>,
    outputs: Vec<PathBuf>,
    metadata: Metadata,
    group_key: GroupKey,
}

impl InvocationContext {
    /// Build a context from declared inputs, outputs and raw metadata
    ///
    /// Metadata is validated before any input is touched, so an unserializable
    /// entry rejects the unit without I/O.
    pub fn build(
        inputs: Vec<PathBuf>,
        outputs: Vec<PathBuf>,
        raw_metadata: &RawMetadata,
    ) -> Result<Self, GenerationError> {
        let metadata = Metadata::from_raw(raw_metadata)?;
        Self::with_metadata(inputs, outputs, metadata)
    }

    /// Build a context with already-validated metadata.
    ///
    /// Reads each input once, fingerprinting in declared order.
    pub fn with_metadata(
        inputs: Vec<PathBuf>,
        outputs: Vec<PathBuf>,
        metadata: Metadata,
    ) -> Result<Self, GenerationError> {
        if outputs.is_empty() {
            return Err(GenerationError::InvalidContext(format!(
                "no outputs declared for {} input(s)",
                inputs.len()
            )));
        }

        let input_fingerprints = inputs
            .iter()
            .map(|input| {
                fingerprint_file(input).map_err(|e| GenerationError::InputUnreadable {
                    path: input.clone(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let group_key = compute_group_key(&outputs);
        Ok(Self {
            inputs,
            input_fingerprints,
            outputs,
            metadata,
            group_key,
        })
    }

    /// Reassemble a context from stored parts, checking the structural invariants.
    pub fn from_parts(
        inputs: Vec<PathBuf>,
        input_fingerprints: Vec<Fingerprint>,
        outputs: Vec<PathBuf>,
        metadata: Metadata,
    ) -> Result<Self, GenerationError> {
        if inputs.len() != input_fingerprints.len() {
            return Err(GenerationError::InvalidContext(format!(
                "{} inputs but {} fingerprints",
                inputs.len(),
                input_fingerprints.len()
            )));
        }
        if outputs.is_empty() {
            return Err(GenerationError::InvalidContext(
                "no outputs declared".to_string(),
            ));
        }
        let group_key = compute_group_key(&outputs);
        Ok(Self {
            inputs,
            input_fingerprints,
            outputs,
            metadata,
            group_key,
        })
    }

    pub fn inputs(&self) -> &[PathBuf] {
        &self.inputs
    }

    pub fn input_fingerprints(&self) -> &[Fingerprint] {
        &self.input_fingerprints
    }

    pub fn outputs(&self) -> &[PathBuf] {
        &self.outputs
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn group_key(&self) -> &GroupKey {
        &self.group_key
    }

    /// Input/output pairs, positionally aligned. Only meaningful when the
    /// generator produces one output per input.
    pub fn pairs(&self) -> impl Iterator<Item = (&Path, &Path)> {
        self.inputs
            .iter()
            .map(PathBuf::as_path)
            .zip(self.outputs.iter().map(PathBuf::as_path))
    }

    /// Human-readable label for diagnostics: the first input plus a count.
    pub fn label(&self) -> String {
        match self.inputs.as_slice() {
            [] => self.outputs[0].display().to_string(),
            [single] => single.display().to_string(),
            [first, rest @ ..] => format!("{} (+{} more)", first.display(), rest.len()),
        }
    }
}
