//! Engine Module
//!
//! The core storage engine that coordinates all components.
//!
//! ## Responsibilities
//! - Coordinate WAL, MemTable, and the tables tree
//! - Recover the MemTable from the WAL on startup
//! - Run periodic maintenance: flush the MemTable, compact levels
//! - Resolve reads with correct shadowing (MemTable → level 0 → level N)

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec;
use crate::config::Config;
use crate::entry::{Entry, Lookup};
use crate::error::Result;
use crate::memtable::MemTable;
use crate::storage::{TablesTree, TreeOptions};
use crate::wal::Wal;

/// The main storage engine
///
/// A cheap, clonable handle. All clones share one engine; the background
/// maintenance thread stops when the last clone is dropped.
///
/// ## Concurrency Model: one lock per logical operation
///
/// - `state` guards MemTable + WAL + tables tree jointly
/// - Held for a whole get, a whole set/delete, or a whole maintenance pass,
///   so no reader can see the MemTable swapped while the WAL is not yet
///   reset (or the reverse)
/// - Components keep their own inner locks, always taken inside `state` in
///   the order MemTable → WAL → tables tree
#[derive(Clone)]
pub struct Engine {
    shared: Arc<Shared>,
    _maintenance: Arc<Maintenance>,
}

struct Shared {
    /// Engine configuration
    config: Config,
    state: Mutex<State>,
}

struct State {
    /// In-memory table for recent writes
    memtable: MemTable,
    /// Write-ahead log for durability
    wal: Wal,
    /// Leveled SSTables
    tree: TablesTree,
}

/// Owns the maintenance thread; dropping it disconnects the shutdown
/// channel and joins the thread
struct Maintenance {
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Engine {
    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Validate config, create data directory
    /// 2. Rebuild the MemTable from the WAL
    /// 3. Load existing SSTables into their levels
    /// 4. Start the maintenance thread
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        // Step 1: Create data directory if it doesn't exist
        fs::create_dir_all(&config.data_dir)?;

        // Step 2: Recover MemTable from WAL
        let (wal, memtable) = Wal::load(&config.data_dir, config.wal_sync_strategy)?;

        // Step 3: Load tables tree
        let tree = TablesTree::open(&config.data_dir, TreeOptions::from(&config))?;

        tracing::info!(
            data_dir = %config.data_dir.display(),
            memtable_keys = memtable.count(),
            tables = tree.total_tables(),
            "Engine opened"
        );

        let shared = Arc::new(Shared {
            config,
            state: Mutex::new(State {
                memtable,
                wal,
                tree,
            }),
        });

        // Step 4: Background maintenance. Nothing is ever sent on this
        // channel; dropping the sender is the shutdown signal.
        let (shutdown_tx, shutdown_rx) = channel::bounded::<()>(0);
        let worker = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("lodekv-maintenance".to_string())
            .spawn(move || worker.run_maintenance(shutdown_rx))?;

        Ok(Self {
            shared,
            _maintenance: Arc::new(Maintenance {
                shutdown: Some(shutdown_tx),
                handle: Some(handle),
            }),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    /// Get a value by key
    ///
    /// Search order:
    /// 1. MemTable (most recent writes)
    /// 2. Level 0 → deepest level, newest table first within a level
    ///
    /// A tombstone anywhere along the way ends the search with `None`.
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let state = self.shared.state.lock();
        Ok(state.lookup(key)?.into_value())
    }

    /// Put a key-value pair
    pub fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let state = self.shared.state.lock();

        state.wal.write(&Entry::put(key, value))?;
        state.memtable.set(key, value);

        Ok(())
    }

    /// Delete a key
    ///
    /// Always records a tombstone, even for keys this engine never saw, so
    /// the deletion shadows any copy in the SSTables.
    pub fn delete(&self, key: &str) -> Result<()> {
        let state = self.shared.state.lock();

        state.wal.write(&Entry::tombstone(key))?;
        state.memtable.delete(key);

        Ok(())
    }

    /// Delete a key and return the value that was visible before
    pub fn delete_and_get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let state = self.shared.state.lock();

        let previous = state.lookup(key)?.into_value();
        state.wal.write(&Entry::tombstone(key))?;
        state.memtable.delete(key);

        Ok(previous)
    }

    /// Store a typed value, encoded with [`codec::encode_value`]
    pub fn set_value<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = codec::encode_value(value)?;
        self.set(key, &bytes)
    }

    /// Fetch and decode a typed value
    pub fn get_value<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key)? {
            Some(bytes) => Ok(Some(codec::decode_value(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Flush the MemTable to a level-0 table now, regardless of thresholds
    ///
    /// Returns false if there was nothing to flush.
    pub fn flush(&self) -> Result<bool> {
        self.shared.state.lock().flush()
    }

    /// Run one compaction sweep now, returning the number of levels merged
    pub fn compact(&self) -> Result<usize> {
        self.shared.state.lock().tree.compaction()
    }

    /// Run one maintenance pass now (the same work the background thread
    /// does on every tick)
    pub fn maintain(&self) -> Result<()> {
        self.shared.maintain()
    }

    /// Close this handle, syncing the WAL to disk
    ///
    /// The maintenance thread stops once every clone is closed or dropped.
    pub fn close(self) -> Result<()> {
        let state = self.shared.state.lock();
        state.wal.sync()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.shared.config.data_dir
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    /// Number of keys in the MemTable, tombstones included
    pub fn memtable_count(&self) -> usize {
        self.shared.state.lock().memtable.count()
    }

    /// Current WAL size in bytes
    pub fn wal_size(&self) -> u64 {
        self.shared.state.lock().wal.size()
    }

    /// Number of tables in `level`
    pub fn table_count(&self, level: usize) -> usize {
        self.shared.state.lock().tree.table_count(level)
    }

    /// Paths of every SSTable, level by level
    pub fn table_paths(&self) -> Vec<PathBuf> {
        self.shared.state.lock().tree.table_paths()
    }
}

impl Shared {
    /// Maintenance loop: one pass per tick until shutdown disconnects
    fn run_maintenance(&self, shutdown: Receiver<()>) {
        let ticker = channel::tick(self.config.check_interval);

        loop {
            crossbeam::select! {
                recv(ticker) -> _ => {
                    if let Err(e) = self.maintain() {
                        tracing::error!(error = %e, "Maintenance pass failed");
                    }
                }
                recv(shutdown) -> _ => break,
            }
        }

        tracing::debug!("Maintenance thread stopped");
    }

    /// Flush if a threshold is reached, then compact
    fn maintain(&self) -> Result<()> {
        let mut state = self.state.lock();

        if state.needs_flush(&self.config) {
            tracing::info!(
                keys = state.memtable.count(),
                wal_bytes = state.wal.size(),
                "Flush threshold reached"
            );
            state.flush()?;
        }

        state.tree.compaction()?;
        Ok(())
    }
}

impl State {
    fn lookup(&self, key: &str) -> Result<Lookup> {
        match self.memtable.search(key) {
            Lookup::Absent => self.tree.search(key),
            resolved => Ok(resolved),
        }
    }

    fn needs_flush(&self, config: &Config) -> bool {
        !self.memtable.is_empty()
            && (self.memtable.count() >= config.threshold
                || self.wal.size() >= config.wal_size_limit)
    }

    /// Swap the MemTable into a new level-0 table, then reset the WAL
    fn flush(&mut self) -> Result<bool> {
        if self.memtable.is_empty() {
            return Ok(false);
        }

        let frozen = self.memtable.swap();
        let values = frozen.values();

        let generation = match self.tree.create_table(&values, 0) {
            Ok(generation) => generation,
            Err(e) => {
                // Nothing was written meanwhile; put the data back
                self.memtable = frozen;
                return Err(e);
            }
        };

        // Entries are now durable in the table
        self.wal.reset()?;

        tracing::info!(keys = values.len(), generation, "Flushed MemTable to level 0");
        Ok(true)
    }
}

impl Drop for Maintenance {
    fn drop(&mut self) {
        drop(self.shutdown.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Maintenance thread panicked");
            }
        }
    }
}
