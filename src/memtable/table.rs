//! MemTable implementation
//!
//! Skip-list memtable with RwLock for concurrency.

use parking_lot::RwLock;

use crate::entry::{Entry, Lookup};

use super::skiplist::SkipList;

/// In-memory table for recent writes
pub struct MemTable {
    list: RwLock<SkipList>,
}

impl MemTable {
    /// Create a new empty MemTable
    pub fn new() -> Self {
        Self {
            list: RwLock::new(SkipList::new()),
        }
    }

    /// Look up a key (read lock)
    pub fn search(&self, key: &str) -> Lookup {
        let list = self.list.read();
        match list.get(key) {
            Some(entry) if entry.deleted => Lookup::Tombstoned,
            Some(entry) => Lookup::Found(entry.clone()),
            None => Lookup::Absent,
        }
    }

    /// Put a key-value pair (write lock)
    ///
    /// Returns the previous entry if the key held a live value. Reviving a
    /// tombstone returns `None`.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Option<Entry> {
        let previous = self.list.write().upsert(Entry::put(key, value));
        previous.filter(|entry| !entry.deleted)
    }

    /// Delete a key (write lock)
    ///
    /// A key that was never seen still gets a tombstone so the deletion
    /// shadows older copies in SSTables. Returns the previous entry if the
    /// key held a live value.
    pub fn delete(&self, key: impl Into<String>) -> Option<Entry> {
        let key = key.into();
        let mut list = self.list.write();

        if matches!(list.get(&key), Some(entry) if entry.deleted) {
            return None;
        }

        list.upsert(Entry::tombstone(key))
            .filter(|entry| !entry.deleted)
    }

    /// Replay a logged or stored entry
    pub fn apply(&self, entry: Entry) -> Option<Entry> {
        if entry.deleted {
            self.delete(entry.key)
        } else {
            let value = entry.value.unwrap_or_default();
            self.set(entry.key, value)
        }
    }

    /// Number of distinct keys, tombstones included
    pub fn count(&self) -> usize {
        self.list.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// All entries in ascending key order, tombstones included
    pub fn values(&self) -> Vec<Entry> {
        self.list.read().iter().cloned().collect()
    }

    /// Take the current contents, leaving this table empty
    pub fn swap(&self) -> MemTable {
        let taken = std::mem::take(&mut *self.list.write());
        MemTable {
            list: RwLock::new(taken),
        }
    }
}

impl Default for MemTable {
    fn default() -> Self {
        Self::new()
    }
}
