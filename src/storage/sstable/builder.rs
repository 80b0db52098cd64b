//! SSTable Builder
//!
//! Writes entries to a new SSTable file.
//!
//! The table is written under a `.tmp` name and renamed into place once it
//! is complete and synced, so a failed build never leaves a truncated
//! `.db` file behind.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::entry::Entry;
use crate::error::{LodeError, Result};

use super::{MetaInfo, Position, SSTable, FORMAT_VERSION};

/// Builder for creating new SSTables
///
/// Entries are written to the data region in the order they are added. A key
/// added twice keeps only its last position in the index.
pub struct SSTableBuilder {
    /// Final table path
    path: PathBuf,
    /// Path written to until `finish` renames it to `path`
    temp_path: PathBuf,
    /// Buffered writer for performance
    writer: BufWriter<File>,
    /// Bytes written to the data region so far
    data_len: u64,
    /// Index: key → position in the data region
    index: BTreeMap<String, Position>,
}

impl SSTableBuilder {
    /// Create a new SSTable builder for `path`
    ///
    /// Nothing appears at `path` itself until [`SSTableBuilder::finish`].
    pub fn new(path: &Path) -> Result<Self> {
        let temp_path = temp_path(path);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&temp_path)?;

        Ok(Self {
            path: path.to_path_buf(),
            temp_path,
            writer: BufWriter::new(file),
            data_len: 0,
            index: BTreeMap::new(),
        })
    }

    /// Append one entry (live or tombstone) to the data region
    pub fn add(&mut self, entry: &Entry) -> Result<()> {
        let bytes = entry.encode()?;
        self.writer.write_all(&bytes)?;

        self.index.insert(
            entry.key.clone(),
            Position {
                start: self.data_len,
                length: bytes.len() as u64,
                deleted: entry.deleted,
            },
        );
        self.data_len += bytes.len() as u64;

        Ok(())
    }

    /// Number of distinct keys added
    pub fn entry_count(&self) -> usize {
        self.index.len()
    }

    /// Path of the in-progress file
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Finish building: write index and trailer, sync, move into place and
    /// reopen read-only
    pub fn finish(mut self) -> Result<SSTable> {
        let index_bytes = serde_json::to_vec(&self.index)?;
        self.writer.write_all(&index_bytes)?;

        let meta = MetaInfo {
            version: FORMAT_VERSION,
            data_start: 0,
            data_len: self.data_len,
            index_start: self.data_len,
            index_len: index_bytes.len() as u64,
        };
        self.writer.write_all(&meta.encode())?;
        self.writer.flush()?;

        let file = self
            .writer
            .into_inner()
            .map_err(|e| LodeError::Io(e.into_error()))?;
        file.sync_all()?;
        drop(file);

        fs::rename(&self.temp_path, &self.path)?;

        let file = File::open(&self.path)?;
        let file_size = file.metadata()?.len();

        Ok(SSTable::from_parts(
            self.path,
            file,
            meta,
            self.index,
            file_size,
        ))
    }
}

impl SSTable {
    /// Write `entries` to a new table at `path`
    ///
    /// On failure the partial file is removed.
    pub fn build(path: &Path, entries: &[Entry]) -> Result<SSTable> {
        let mut builder = SSTableBuilder::new(path)?;
        let temp = builder.temp_path().to_path_buf();

        let result = entries
            .iter()
            .try_for_each(|entry| builder.add(entry))
            .and_then(|()| builder.finish());

        if let Err(e) = &result {
            match fs::remove_file(&temp) {
                Ok(()) => {}
                Err(rm) if rm.kind() == ErrorKind::NotFound => {}
                Err(rm) => tracing::warn!(
                    path = %temp.display(),
                    error = %rm,
                    "Failed to remove partial table"
                ),
            }
            tracing::debug!(path = %path.display(), error = %e, "Table build failed");
        }

        result
    }
}

/// "<table path>.tmp"
fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}
