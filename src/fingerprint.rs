//! Content fingerprints and group keys using BLAKE3

use crate::paths;
use crate::types::{GroupKey, Hash};
use blake3::Hasher;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::Path;

/// Deterministic 256-bit digest of an input artifact's bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(Hash);

impl Fingerprint {
    pub fn from_bytes(bytes: Hash) -> Self {
        Fingerprint(bytes)
    }

    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a 64-character hex digest.
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        let hash: Hash = bytes.try_into().ok()?;
        Some(Fingerprint(hash))
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", &self.to_hex()[..12])
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Fingerprint::from_hex(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid fingerprint: {}", s)))
    }
}

/// Compute the fingerprint of a byte sequence
pub fn fingerprint(content: &[u8]) -> Fingerprint {
    let mut hasher = Hasher::new();
    hasher.update(content);
    Fingerprint(*hasher.finalize().as_bytes())
}

/// Read a file once and fingerprint its bytes.
///
/// The I/O error is returned as-is; callers decide how fatal it is.
pub fn fingerprint_file(path: &Path) -> std::io::Result<Fingerprint> {
    let bytes = std::fs::read(path)?;
    Ok(fingerprint(&bytes))
}

/// Derive the store key for a group of outputs
///
/// GroupKey = hash("group" || count || (len || normalized_output)*)
///
/// Output order is significant: the same outputs listed in a different order
/// form a different group.
pub fn compute_group_key(outputs: &[impl AsRef<Path>]) -> GroupKey {
    let mut hasher = Hasher::new();

    hasher.update(b"group");
    hasher.update(&(outputs.len() as u64).to_be_bytes());

    for output in outputs {
        let bytes = paths::identifier_bytes(output.as_ref());
        hasher.update(&(bytes.len() as u64).to_be_bytes());
        hasher.update(&bytes);
    }

    GroupKey::from_hex(hex::encode(hasher.finalize().as_bytes()))
}
