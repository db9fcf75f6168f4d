//! Staleness Comparator
//!
//! Decides whether a group must be regenerated by comparing a freshly built
//! context against the persisted one. Cheap, decisive signals (force flag,
//! absent entry) are checked before fingerprints, and fingerprints before
//! metadata.

use crate::context::{InvocationContext, Metadata};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a group is (or is not) being regenerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationReason {
    /// Caller requested unconditional regeneration
    Forced,
    /// No persisted context exists for the group
    NewOutput,
    /// Input identities, order, or content changed
    InputChanged,
    /// Generator metadata changed
    MetadataChanged,
    /// Nothing to do
    UpToDate,
}

impl InvocationReason {
    pub fn requires_invocation(&self) -> bool {
        !matches!(self, InvocationReason::UpToDate)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InvocationReason::Forced => "forced",
            InvocationReason::NewOutput => "new-output",
            InvocationReason::InputChanged => "input-changed",
            InvocationReason::MetadataChanged => "metadata-changed",
            InvocationReason::UpToDate => "up-to-date",
        }
    }
}

impl fmt::Display for InvocationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generator-supplied metadata equality.
///
/// Lets a generator declare some metadata irrelevant to staleness.
pub trait MetadataComparator: Send + Sync {
    fn equivalent(&self, fresh: &Metadata, persisted: &Metadata) -> bool;
}

/// Plain structural equality; the default when a generator supplies nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralComparator;

impl MetadataComparator for StructuralComparator {
    fn equivalent(&self, fresh: &Metadata, persisted: &Metadata) -> bool {
        fresh == persisted
    }
}

/// Structural equality after dropping keys that do not affect output.
#[derive(Debug, Clone, Default)]
pub struct IgnoreKeysComparator {
    ignored: Vec<String>,
}

impl IgnoreKeysComparator {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ignored: keys.into_iter().map(Into::into).collect(),
        }
    }
}

impl MetadataComparator for IgnoreKeysComparator {
    fn equivalent(&self, fresh: &Metadata, persisted: &Metadata) -> bool {
        fresh.without_keys(&self.ignored) == persisted.without_keys(&self.ignored)
    }
}

/// Compare a fresh context with the persisted one.
pub fn compare(
    fresh: &InvocationContext,
    persisted: Option<&InvocationContext>,
    forced: bool,
    comparator: Option<&dyn MetadataComparator>,
) -> InvocationReason {
    if forced {
        return InvocationReason::Forced;
    }

    let persisted = match persisted {
        Some(p) => p,
        None => return InvocationReason::NewOutput,
    };

    if fresh.inputs() != persisted.inputs()
        || fresh.input_fingerprints() != persisted.input_fingerprints()
    {
        return InvocationReason::InputChanged;
    }

    let equivalent = match comparator {
        Some(c) => c.equivalent(fresh.metadata(), persisted.metadata()),
        None => StructuralComparator.equivalent(fresh.metadata(), persisted.metadata()),
    };
    if !equivalent {
        return InvocationReason::MetadataChanged;
    }

    InvocationReason::UpToDate
}
