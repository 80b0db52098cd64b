//! WAL Writer
//!
//! Owns the log file: loading it at startup, appending records, and
//! resetting it after a flush.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use parking_lot::Mutex;

use crate::config::WalSyncStrategy;
use crate::entry::Entry;
use crate::error::{LodeError, Result};
use crate::memtable::MemTable;

use super::{encode_record, WalRecovery, WAL_FILENAME};

/// Append-only log file guarded by its own lock
pub struct Wal {
    path: PathBuf,
    sync_strategy: WalSyncStrategy,
    inner: Mutex<WalFile>,
}

struct WalFile {
    /// `None` only if reopening after a reset failed; `write` reopens it
    file: Option<File>,
    /// Current file size in bytes
    size: u64,
    /// Records written since the last fsync
    unsynced: usize,
}

impl Wal {
    /// Open (creating if absent) `dir/wal.log` and replay it.
    ///
    /// Returns the log, positioned at end of file for appends, and the
    /// MemTable rebuilt from its records.
    pub fn load(dir: &Path, sync_strategy: WalSyncStrategy) -> Result<(Self, MemTable)> {
        let start = Instant::now();
        fs::create_dir_all(dir)?;

        let path = dir.join(WAL_FILENAME);
        let mut file = open_log(&path)?;
        let size = file.metadata()?.len();

        let memtable = if size == 0 {
            MemTable::new()
        } else {
            let mut log = Vec::with_capacity(size as usize);
            file.seek(SeekFrom::Start(0))?;
            file.read_to_end(&mut log)?;

            let (memtable, result) = WalRecovery::replay(&log)?;
            tracing::info!(
                path = %path.display(),
                entries = result.entries_recovered,
                tombstones = result.tombstones_recovered,
                bytes = result.bytes_read,
                "WAL recovered"
            );
            memtable
        };

        file.seek(SeekFrom::End(0))?;
        tracing::debug!(elapsed = ?start.elapsed(), "WAL loaded");

        Ok((
            Self {
                path,
                sync_strategy,
                inner: Mutex::new(WalFile {
                    file: Some(file),
                    size,
                    unsynced: 0,
                }),
            },
            memtable,
        ))
    }

    /// Append one entry as a length-prefixed record
    pub fn write(&self, entry: &Entry) -> Result<()> {
        let record = encode_record(entry)?;

        let mut guard = self.inner.lock();
        let state = &mut *guard;
        if state.file.is_none() {
            // A previous reset could not reopen the log
            let file = open_log(&self.path)?;
            state.size = file.metadata()?.len();
            state.unsynced = 0;
            state.file = Some(file);
        }
        let file = state
            .file
            .as_mut()
            .ok_or_else(|| LodeError::Storage("WAL file is not open".to_string()))?;

        file.write_all(&record)?;
        state.size += record.len() as u64;
        state.unsynced += 1;

        let due = match self.sync_strategy {
            WalSyncStrategy::EveryWrite => true,
            WalSyncStrategy::EveryNEntries { count } => state.unsynced >= count,
        };
        if due {
            file.sync_data()?;
            state.unsynced = 0;
        }

        Ok(())
    }

    /// Close, delete and recreate the log file
    ///
    /// Only called right after a successful flush, when every record is
    /// already represented by an SSTable. If the old file cannot be removed
    /// it is reopened and appends continue on it; if the new file cannot be
    /// created, the next write retries.
    pub fn reset(&self) -> Result<()> {
        let mut state = self.inner.lock();

        // Dropping the handle closes it
        drop(state.file.take());
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::error!(path = %self.path.display(), error = %e, "Failed to remove WAL");
            state.file = Some(open_log(&self.path)?);
            return Err(e.into());
        }

        state.size = 0;
        state.unsynced = 0;
        state.file = Some(open_log(&self.path)?);

        tracing::debug!(path = %self.path.display(), "WAL reset");
        Ok(())
    }

    /// Force sync to disk
    pub fn sync(&self) -> Result<()> {
        let mut state = self.inner.lock();
        if let Some(file) = state.file.as_mut() {
            file.sync_data()?;
        }
        state.unsynced = 0;
        Ok(())
    }

    /// Current size of the log in bytes
    pub fn size(&self) -> u64 {
        self.inner.lock().size
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn open_log(path: &Path) -> Result<File> {
    Ok(OpenOptions::new()
        .read(true)
        .append(true)
        .create(true)
        .open(path)?)
}
