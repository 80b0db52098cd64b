//! SSTable Reader
//!
//! Opens SSTable files and provides O(log n) key lookups via the resident
//! index.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::entry::{Entry, Lookup};
use crate::error::{LodeError, Result};

use super::{MetaInfo, Position, FORMAT_VERSION, TRAILER_SIZE};

/// An immutable table file with its index loaded into memory
pub struct SSTable {
    path: PathBuf,
    /// Single read-only handle; the lock serializes seek + read
    file: Mutex<File>,
    meta: MetaInfo,
    index: BTreeMap<String, Position>,
    file_size: u64,
}

impl SSTable {
    pub(super) fn from_parts(
        path: PathBuf,
        file: File,
        meta: MetaInfo,
        index: BTreeMap<String, Position>,
        file_size: u64,
    ) -> Self {
        Self {
            path,
            file: Mutex::new(file),
            meta,
            index,
            file_size,
        }
    }

    /// Open an SSTable for reading
    ///
    /// Reads the trailer, then loads the entire index into memory. Any
    /// inconsistency between trailer, index and file size fails the load.
    pub fn load(path: &Path) -> Result<Self> {
        let mut file = File::open(path)?;
        let file_size = file.metadata()?.len();

        if file_size < TRAILER_SIZE as u64 {
            return Err(LodeError::Storage(format!(
                "{}: {} bytes is too short for an SSTable",
                path.display(),
                file_size
            )));
        }

        // Trailer sits at EOF - 40
        file.seek(SeekFrom::End(-(TRAILER_SIZE as i64)))?;
        let mut trailer = [0u8; TRAILER_SIZE];
        file.read_exact(&mut trailer)?;
        let meta = MetaInfo::decode(&trailer)?;

        if meta.version != FORMAT_VERSION {
            return Err(LodeError::Storage(format!(
                "{}: unsupported SSTable version {}",
                path.display(),
                meta.version
            )));
        }

        let body_len = file_size - TRAILER_SIZE as u64;
        let data_end = meta.data_start.checked_add(meta.data_len);
        let index_end = meta.index_start.checked_add(meta.index_len);
        match (data_end, index_end) {
            (Some(d), Some(i)) if d <= meta.index_start && i <= body_len => {}
            _ => {
                return Err(LodeError::Storage(format!(
                    "{}: trailer regions out of bounds: {:?}",
                    path.display(),
                    meta
                )))
            }
        }

        // Load index into memory
        file.seek(SeekFrom::Start(meta.index_start))?;
        let mut index_bytes = vec![0u8; meta.index_len as usize];
        file.read_exact(&mut index_bytes)?;

        let index: BTreeMap<String, Position> = serde_json::from_slice(&index_bytes)
            .map_err(|e| {
                LodeError::Storage(format!("{}: corrupt index: {}", path.display(), e))
            })?;

        if let Some((key, _)) = index
            .iter()
            .find(|(_, pos)| pos.start.saturating_add(pos.length) > meta.data_len)
        {
            return Err(LodeError::Storage(format!(
                "{}: index entry for {:?} points outside the data region",
                path.display(),
                key
            )));
        }

        // Reset file to start for reading
        file.seek(SeekFrom::Start(0))?;

        Ok(Self::from_parts(
            path.to_path_buf(),
            file,
            meta,
            index,
            file_size,
        ))
    }

    /// Look up a key
    ///
    /// Tombstones are answered from the index alone; live keys cost one
    /// seek and one read.
    pub fn search(&self, key: &str) -> Result<Lookup> {
        let position = match self.index.get(key) {
            Some(pos) => *pos,
            None => return Ok(Lookup::Absent),
        };

        if position.deleted {
            return Ok(Lookup::Tombstoned);
        }

        let mut buf = vec![0u8; position.length as usize];
        {
            let mut file = self.file.lock();
            file.seek(SeekFrom::Start(self.meta.data_start + position.start))?;
            file.read_exact(&mut buf)?;
        }

        let entry = Entry::decode(&buf)?;
        if entry.key != key {
            return Err(LodeError::Storage(format!(
                "{}: index points {:?} at a record for {:?}",
                self.path.display(),
                key,
                entry.key
            )));
        }

        Ok(Lookup::Found(entry))
    }

    /// Every entry in ascending key order, tombstones included
    ///
    /// Reads the data region in one go; used by compaction.
    pub fn entries(&self) -> Result<Vec<Entry>> {
        let mut data = vec![0u8; self.meta.data_len as usize];
        {
            let mut file = self.file.lock();
            file.seek(SeekFrom::Start(self.meta.data_start))?;
            file.read_exact(&mut data)?;
        }

        self.index
            .iter()
            .map(|(key, pos)| {
                if pos.deleted {
                    return Ok(Entry::tombstone(key.clone()));
                }
                let start = pos.start as usize;
                let end = start + pos.length as usize;
                Entry::decode(&data[start..end])
            })
            .collect()
    }

    /// Delete the backing file
    ///
    /// The open handle stays readable until the table is dropped, so a
    /// failed delete leaves the table fully usable.
    pub fn destroy(&self) -> Result<()> {
        fs::remove_file(&self.path)?;
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn meta(&self) -> &MetaInfo {
        &self.meta
    }

    /// Number of keys in the index, tombstones included
    pub fn entry_count(&self) -> usize {
        self.index.len()
    }

    /// Size of the table file in bytes
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }
}
