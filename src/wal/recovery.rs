//! WAL Recovery
//!
//! Rebuilds a MemTable by replaying the WAL.

use crate::error::Result;
use crate::memtable::MemTable;

use super::WalReader;

/// Handles WAL recovery after restart
pub struct WalRecovery;

/// Result of a recovery operation
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of records replayed
    pub entries_recovered: u64,

    /// How many of those were deletions
    pub tombstones_recovered: u64,

    /// Bytes consumed from the log
    pub bytes_read: u64,
}

impl WalRecovery {
    /// Replay every record of `log` into a fresh MemTable
    ///
    /// Records are applied in file order, so the rebuilt table reflects the
    /// exact key history. Any framing or decoding failure aborts recovery.
    pub fn replay(log: &[u8]) -> Result<(MemTable, RecoveryResult)> {
        let memtable = MemTable::new();
        let mut result = RecoveryResult::default();

        let mut reader = WalReader::new(log);
        while let Some(entry) = reader.next_entry()? {
            if entry.deleted {
                result.tombstones_recovered += 1;
            }
            memtable.apply(entry);
            result.entries_recovered += 1;
        }
        result.bytes_read = reader.offset() as u64;

        Ok((memtable, result))
    }
}
