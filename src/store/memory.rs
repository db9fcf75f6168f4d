//! In-process Context Store for embedding and tests.

use crate::context::InvocationContext;
use crate::error::StorageError;
use crate::store::{decode_listing, decode_or_miss, encode_entry, ContextStore, StoreListing};
use crate::types::GroupKey;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Keeps encoded entries in memory, so corruption behaves exactly as on disk.
#[derive(Default)]
pub struct MemoryContextStore {
    entries: RwLock<BTreeMap<GroupKey, Vec<u8>>>,
}

impl MemoryContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_raw(&self, key: &GroupKey, bytes: &[u8]) {
        self.entries.write().insert(key.clone(), bytes.to_vec());
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn contains(&self, key: &GroupKey) -> bool {
        self.entries.read().contains_key(key)
    }
}

impl ContextStore for MemoryContextStore {
    fn load(&self, key: &GroupKey) -> Result<Option<InvocationContext>, StorageError> {
        let entries = self.entries.read();
        Ok(entries.get(key).and_then(|bytes| decode_or_miss(key, bytes)))
    }

    fn save(&self, key: &GroupKey, context: &InvocationContext) -> Result<(), StorageError> {
        if context.group_key() != key {
            return Err(StorageError::InvalidPath(format!(
                "context for group {} saved under {}",
                context.group_key(),
                key
            )));
        }
        let bytes = encode_entry(context)?;
        self.entries.write().insert(key.clone(), bytes);
        Ok(())
    }

    fn delete(&self, key: &GroupKey) -> Result<bool, StorageError> {
        Ok(self.entries.write().remove(key).is_some())
    }

    fn list(&self) -> Result<Vec<StoreListing>, StorageError> {
        let entries = self.entries.read();
        Ok(entries
            .iter()
            .map(|(key, bytes)| StoreListing {
                group_key: key.clone(),
                entry: decode_listing(key, bytes),
            })
            .collect())
    }
}
