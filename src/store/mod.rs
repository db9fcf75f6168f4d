//! Context Store
//!
//! Persists the invocation context of each output group across runs, keyed by
//! [`GroupKey`]. The store is a passive container: the orchestrator decides
//! when entries are written, the cleaner decides when they are removed.
//!
//! Entries are versioned bincode envelopes. Anything that fails to decode is
//! reported as absent so a damaged cache only ever costs a regeneration.

pub mod memory;
pub mod persistence;

pub use memory::MemoryContextStore;
pub use persistence::SledContextStore;

use crate::context::{InvocationContext, Metadata};
use crate::error::{GenerationError, StorageError};
use crate::fingerprint::Fingerprint;
use crate::paths;
use crate::types::GroupKey;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Current envelope version. Entries with any other version read as absent.
pub const ENTRY_VERSION: u32 = 2;

/// Persisted form of one group's context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub version: u32,
    pub group_key: String,
    /// Raw path bytes, so names that are not UTF-8 survive a round trip
    pub inputs: Vec<Vec<u8>>,
    /// Hex digests, aligned with `inputs`
    pub input_fingerprints: Vec<String>,
    pub outputs: Vec<Vec<u8>>,
    /// Metadata as a JSON object (bincode cannot carry arbitrary JSON values)
    pub metadata_json: String,
    /// RFC 3339 timestamp of the successful generation
    pub recorded_at: String,
}

impl StoredEntry {
    pub fn from_context(context: &InvocationContext) -> Result<Self, StorageError> {
        let metadata_json = context
            .metadata()
            .to_json()
            .map_err(|e| StorageError::Serialization(format!("Failed to encode metadata: {}", e)))?;

        Ok(StoredEntry {
            version: ENTRY_VERSION,
            group_key: context.group_key().to_string(),
            inputs: context
                .inputs()
                .iter()
                .map(|p| paths::os_to_bytes(p.as_os_str()))
                .collect(),
            input_fingerprints: context
                .input_fingerprints()
                .iter()
                .map(Fingerprint::to_hex)
                .collect(),
            outputs: context
                .outputs()
                .iter()
                .map(|p| paths::os_to_bytes(p.as_os_str()))
                .collect(),
            metadata_json,
            recorded_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    /// Rebuild the context, validating every field against the addressing key.
    pub fn into_context(self, key: &GroupKey) -> Result<InvocationContext, GenerationError> {
        let corrupt = |message: String| GenerationError::StoreCorrupt {
            group_key: key.clone(),
            message,
        };

        if self.version != ENTRY_VERSION {
            return Err(corrupt(format!(
                "unsupported entry version {} (expected {})",
                self.version, ENTRY_VERSION
            )));
        }
        if self.group_key != key.as_str() {
            return Err(corrupt(format!(
                "entry is recorded under group {}",
                self.group_key
            )));
        }

        let fingerprints = self
            .input_fingerprints
            .iter()
            .map(|hex| {
                Fingerprint::from_hex(hex).ok_or_else(|| corrupt(format!("bad fingerprint '{}'", hex)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let metadata = Metadata::from_json(&self.metadata_json)
            .map_err(|e| corrupt(format!("bad metadata: {}", e)))?;

        let context = InvocationContext::from_parts(
            self.inputs.into_iter().map(path_from_bytes).collect(),
            fingerprints,
            self.outputs.into_iter().map(path_from_bytes).collect(),
            metadata,
        )
        .map_err(|e| corrupt(e.to_string()))?;

        if context.group_key() != key {
            return Err(corrupt("outputs do not hash to the addressing key".to_string()));
        }
        Ok(context)
    }

    pub fn output_paths(&self) -> Vec<PathBuf> {
        self.outputs.iter().cloned().map(path_from_bytes).collect()
    }
}

fn path_from_bytes(bytes: Vec<u8>) -> PathBuf {
    PathBuf::from(paths::os_from_bytes(bytes))
}

/// A key present in the store and its entry, if it decodes and validates.
#[derive(Debug, Clone)]
pub struct StoreListing {
    pub group_key: GroupKey,
    pub entry: Option<StoredEntry>,
}

/// Keyed persistence for invocation contexts.
///
/// Implementations must allow concurrent `load`/`save` on distinct keys.
pub trait ContextStore: Send + Sync {
    /// Load the context stored for `key`.
    ///
    /// Returns `Ok(None)` for absent and for corrupt entries alike; `Err` only
    /// when the backend itself fails.
    fn load(&self, key: &GroupKey) -> Result<Option<InvocationContext>, StorageError>;

    /// Replace the entry for `key` wholesale.
    fn save(&self, key: &GroupKey, context: &InvocationContext) -> Result<(), StorageError>;

    /// Remove the entry for `key`. Returns whether one existed.
    fn delete(&self, key: &GroupKey) -> Result<bool, StorageError>;

    /// Every key in the store, sorted by key.
    fn list(&self) -> Result<Vec<StoreListing>, StorageError>;
}

pub(crate) fn encode_entry(context: &InvocationContext) -> Result<Vec<u8>, StorageError> {
    let entry = StoredEntry::from_context(context)?;
    bincode::serialize(&entry)
        .map_err(|e| StorageError::Serialization(format!("Failed to serialize context: {}", e)))
}

pub(crate) fn decode_entry(key: &GroupKey, bytes: &[u8]) -> Result<StoredEntry, GenerationError> {
    bincode::deserialize::<StoredEntry>(bytes).map_err(|e| GenerationError::StoreCorrupt {
        group_key: key.clone(),
        message: format!("Failed to deserialize entry: {}", e),
    })
}

/// Decode an entry for listing. Entries that decode but fail validation
/// against `key` are reported as `None`, the same as undecodable ones.
pub(crate) fn decode_listing(key: &GroupKey, bytes: &[u8]) -> Option<StoredEntry> {
    let entry = decode_entry(key, bytes).ok()?;
    entry.clone().into_context(key).ok().map(|_| entry)
}

/// Decode stored bytes into a context, downgrading corruption to a miss.
pub(crate) fn decode_or_miss(key: &GroupKey, bytes: &[u8]) -> Option<InvocationContext> {
    match decode_entry(key, bytes).and_then(|entry| entry.into_context(key)) {
        Ok(context) => Some(context),
        Err(e) => {
            warn!(group_key = %key.short(), error = %e, "Ignoring corrupt context entry");
            None
        }
    }
}
