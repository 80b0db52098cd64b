//! WAL Reader
//!
//! Record framing: encoding one entry, and walking a buffer of records.

use bytes::{Buf, BufMut, BytesMut};

use crate::entry::Entry;
use crate::error::{LodeError, Result};

/// Size of the little-endian length prefix in front of every record
pub const LEN_PREFIX_SIZE: usize = 8;

/// Frame an entry as `[len: u64 LE][entry bytes]`
pub fn encode_record(entry: &Entry) -> Result<Vec<u8>> {
    let body = entry.encode()?;
    let mut buf = BytesMut::with_capacity(LEN_PREFIX_SIZE + body.len());
    buf.put_u64_le(body.len() as u64);
    buf.put_slice(&body);
    Ok(buf.to_vec())
}

/// Reads entries from an in-memory copy of the WAL file
pub struct WalReader<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> WalReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    /// Byte offset of the next record
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Read the next entry from the WAL
    pub fn next_entry(&mut self) -> Result<Option<Entry>> {
        let start = self.offset;
        let remaining = self.buf.len() - start;

        if remaining == 0 {
            return Ok(None);
        }

        if remaining < LEN_PREFIX_SIZE {
            return Err(LodeError::WalCorruption(format!(
                "truncated length prefix at offset {}",
                start
            )));
        }

        let mut prefix = &self.buf[start..start + LEN_PREFIX_SIZE];
        let len = prefix.get_u64_le() as usize;

        let body_start = start + LEN_PREFIX_SIZE;
        let body_end = match body_start.checked_add(len) {
            Some(end) if end <= self.buf.len() => end,
            _ => {
                return Err(LodeError::WalCorruption(format!(
                    "record at offset {} claims {} bytes, only {} remain",
                    start,
                    len,
                    self.buf.len() - body_start
                )))
            }
        };

        let entry = Entry::decode(&self.buf[body_start..body_end]).map_err(|e| {
            LodeError::WalCorruption(format!("undecodable record at offset {}: {}", start, e))
        })?;

        self.offset = body_end;
        Ok(Some(entry))
    }
}

impl<'a> Iterator for WalReader<'a> {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => None,
            Err(e) => {
                // Stop after the first bad record
                self.offset = self.buf.len();
                Some(Err(e))
            }
        }
    }
}
