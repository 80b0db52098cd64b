//! SSTable Module
//!
//! Sorted String Table - immutable on-disk key-value storage.
//!
//! ## File Format
//! ```text
//! 0 ──────────────────────────────────────────────────────────────►
//! ┌──────────────────────────┬─────────────────┬───────────────────┐
//! │ Data                     │ Index           │ MetaInfo (40 B)   │
//! │ JSON Entry, JSON Entry.. │ JSON map        │ 5 x u64 LE        │
//! │                          │ key → Position  │                   │
//! └──────────────────────────┴─────────────────┴───────────────────┘
//!
//! MetaInfo: version | data_start | data_len | index_start | index_len
//! Position: { start, length, deleted }  (start is relative to data_start)
//! ```
//!
//! The index is loaded whole and stays resident; the data region is only
//! touched for live keys.

mod builder;
mod reader;

use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};

use crate::error::{LodeError, Result};

pub use builder::SSTableBuilder;
pub use reader::SSTable;

// =============================================================================
// Shared Constants (used by builder, reader)
// =============================================================================

/// Current SSTable format version
pub(crate) const FORMAT_VERSION: u64 = 0;

/// Trailer size: five little-endian u64 fields
pub const TRAILER_SIZE: usize = 5 * 8;

// =============================================================================
// On-disk Records
// =============================================================================

/// Location of one serialized entry inside the data region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub start: u64,
    pub length: u64,
    /// Copy of the entry's tombstone flag, so deleted keys need no data read
    pub deleted: bool,
}

/// Trailer stored in the last 40 bytes of every SSTable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetaInfo {
    pub version: u64,
    pub data_start: u64,
    pub data_len: u64,
    pub index_start: u64,
    pub index_len: u64,
}

impl MetaInfo {
    pub fn encode(&self) -> [u8; TRAILER_SIZE] {
        let mut out = [0u8; TRAILER_SIZE];
        let mut buf = &mut out[..];
        buf.put_u64_le(self.version);
        buf.put_u64_le(self.data_start);
        buf.put_u64_le(self.data_len);
        buf.put_u64_le(self.index_start);
        buf.put_u64_le(self.index_len);
        out
    }

    pub fn decode(mut buf: &[u8]) -> Result<Self> {
        if buf.len() != TRAILER_SIZE {
            return Err(LodeError::Storage(format!(
                "trailer must be {} bytes, got {}",
                TRAILER_SIZE,
                buf.len()
            )));
        }

        Ok(Self {
            version: buf.get_u64_le(),
            data_start: buf.get_u64_le(),
            data_len: buf.get_u64_le(),
            index_start: buf.get_u64_le(),
            index_len: buf.get_u64_le(),
        })
    }
}
