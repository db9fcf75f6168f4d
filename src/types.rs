//! Core type aliases and identifiers shared across kiln.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw 32-byte BLAKE3 digest.
pub type Hash = [u8; 32];

/// Identifies one output group in the context store.
///
/// Derived from the normalized output identifiers of a unit of work, so the
/// same outputs always address the same entry and renamed outputs form a new
/// group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKey(String);

impl GroupKey {
    /// Wrap an already-derived key (hex digest).
    pub fn from_hex(hex: impl Into<String>) -> Self {
        GroupKey(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for log lines and tables.
    pub fn short(&self) -> &str {
        let end = self.0.len().min(12);
        &self.0[..end]
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<[u8]> for GroupKey {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}
