//! Entry definitions
//!
//! The atomic unit of data shared by the MemTable, the WAL and SSTables.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A key, an optional payload and a tombstone flag
///
/// Entries are never mutated in place by callers; a newer version of a key
/// is a new `Entry` that replaces the old one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub key: String,
    /// Base64 text in the JSON encoding, `null` for tombstones
    #[serde(with = "base64_value")]
    pub value: Option<Vec<u8>>,
    pub deleted: bool,
}

impl Entry {
    /// A live key-value pair
    pub fn put(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
            deleted: false,
        }
    }

    /// A deletion marker for `key`
    pub fn tombstone(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
            deleted: true,
        }
    }

    /// The payload, or `None` for tombstones regardless of stored bytes
    pub fn value(&self) -> Option<&[u8]> {
        if self.deleted {
            None
        } else {
            self.value.as_deref()
        }
    }

    /// Serialize for the WAL and the SSTable data region
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Inverse of [`Entry::encode`]
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Serde adapter that stores payload bytes as a standard base64 string
mod base64_value {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|text| STANDARD.decode(text).map_err(serde::de::Error::custom))
            .transpose()
    }
}

/// Outcome of searching one component for a key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// The key holds a live value
    Found(Entry),

    /// The key was deleted here; older components must not be consulted
    Tombstoned,

    /// This component knows nothing about the key
    Absent,
}

impl Lookup {
    /// True when the search can stop at this component
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Lookup::Absent)
    }

    /// Collapse into the visible value
    pub fn into_value(self) -> Option<Vec<u8>> {
        match self {
            Lookup::Found(entry) if !entry.deleted => entry.value,
            _ => None,
        }
    }
}
