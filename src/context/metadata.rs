//! Generator metadata: the raw caller-facing form and the validated,
//! persistable form carried by an invocation context.

use crate::error::GenerationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Callable attached to raw metadata. Never persisted.
pub type MetadataCallable = Arc<dyn Fn(&Metadata) -> Value + Send + Sync>;

/// One raw metadata entry as supplied by a generator or caller.
#[derive(Clone)]
pub enum RawValue {
    /// Plain data; persisted and compared structurally.
    Data(Value),
    /// Behaviour rather than data. Rejected at context construction.
    Callable(MetadataCallable),
}

impl fmt::Debug for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Data(v) => f.debug_tuple("Data").field(v).finish(),
            RawValue::Callable(_) => f.write_str("Callable(..)"),
        }
    }
}

impl From<Value> for RawValue {
    fn from(value: Value) -> Self {
        RawValue::Data(value)
    }
}

/// Unvalidated generator metadata.
#[derive(Debug, Clone, Default)]
pub struct RawMetadata {
    entries: BTreeMap<String, RawValue>,
}

impl RawMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<RawValue>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn with_callable(mut self, key: impl Into<String>, f: MetadataCallable) -> Self {
        self.entries.insert(key.into(), RawValue::Callable(f));
        self
    }

    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RawValue)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Validated metadata: string keys to JSON data, ordered by key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, Value>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate raw metadata.
    ///
    /// Fails on the first (in key order) entry that is not plain data, naming it.
    pub fn from_raw(raw: &RawMetadata) -> Result<Self, GenerationError> {
        let mut map = BTreeMap::new();
        for (key, value) in raw.iter() {
            match value {
                RawValue::Data(v) => {
                    map.insert(key.clone(), v.clone());
                }
                RawValue::Callable(_) => {
                    return Err(GenerationError::MetadataUnserializable { key: key.clone() });
                }
            }
        }
        Ok(Metadata(map))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.0.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Copy of this metadata without the given keys.
    pub fn without_keys(&self, keys: &[String]) -> Metadata {
        Metadata(
            self.0
                .iter()
                .filter(|(k, _)| !keys.contains(k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.0)
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s).map(Metadata)
    }
}

impl FromIterator<(String, Value)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Metadata(iter.into_iter().collect())
    }
}
