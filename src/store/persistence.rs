//! Persistence layer for the Context Store

use crate::context::InvocationContext;
use crate::error::StorageError;
use crate::store::{decode_listing, decode_or_miss, encode_entry, ContextStore, StoreListing};
use crate::types::GroupKey;
use sled;
use std::path::Path;

/// Sled-based implementation of ContextStore
///
/// sled handles concurrent readers and writers internally, so distinct keys
/// never interfere.
#[derive(Clone)]
pub struct SledContextStore {
    db: sled::Db,
}

impl SledContextStore {
    /// Open (or create) a store at the given directory.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path.as_ref()).map_err(|e| {
            StorageError::Database(format!(
                "Failed to open sled database at {:?}: {}",
                path.as_ref(),
                e
            ))
        })?;
        Ok(Self { db })
    }

    pub fn from_db(db: sled::Db) -> Self {
        Self { db }
    }

    /// Get the underlying sled database (for advanced operations)
    pub fn db(&self) -> &sled::Db {
        &self.db
    }

    /// Write raw bytes under a key, bypassing encoding.
    pub fn insert_raw(&self, key: &GroupKey, bytes: &[u8]) -> Result<(), StorageError> {
        self.db.insert(key.as_str(), bytes)?;
        Ok(())
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }
}

impl ContextStore for SledContextStore {
    fn load(&self, key: &GroupKey) -> Result<Option<InvocationContext>, StorageError> {
        match self.db.get(key.as_str())? {
            Some(value) => Ok(decode_or_miss(key, &value)),
            None => Ok(None),
        }
    }

    fn save(&self, key: &GroupKey, context: &InvocationContext) -> Result<(), StorageError> {
        if context.group_key() != key {
            return Err(StorageError::InvalidPath(format!(
                "context for group {} saved under {}",
                context.group_key(),
                key
            )));
        }
        let value = encode_entry(context)?;
        self.db.insert(key.as_str(), value)?;
        self.db.flush()?;
        Ok(())
    }

    fn delete(&self, key: &GroupKey) -> Result<bool, StorageError> {
        let existed = self.db.remove(key.as_str())?.is_some();
        self.db.flush()?;
        Ok(existed)
    }

    fn list(&self) -> Result<Vec<StoreListing>, StorageError> {
        let mut listings = Vec::new();
        for item in self.db.iter() {
            let (key, value) = item?;
            let group_key = GroupKey::from_hex(String::from_utf8_lossy(&key).into_owned());
            let entry = decode_listing(&group_key, &value);
            listings.push(StoreListing { group_key, entry });
        }
        // sled iterates in byte order, which for hex keys is already key order
        Ok(listings)
    }
}
