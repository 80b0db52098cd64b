//! Configuration for LodeKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{LodeError, Result};

/// Main configuration for a LodeKV instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── wal.log          (write-ahead log)
    ///     └── <level>.<gen>.db (SSTable files)
    pub data_dir: PathBuf,

    /// Byte budget of level 0; level i gets `level0_size * 10^i`
    pub level0_size: u64,

    /// Max number of tables in one level before it is compacted
    pub part_size: usize,

    /// Deepest level; tables compacted into it are never promoted further
    pub max_level: usize,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync WAL
    pub wal_sync_strategy: WalSyncStrategy,

    /// WAL size (in bytes) that forces a flush
    pub wal_size_limit: u64,

    // -------------------------------------------------------------------------
    // MemTable Configuration
    // -------------------------------------------------------------------------
    /// Number of keys (tombstones included) that triggers a flush
    pub threshold: usize,

    // -------------------------------------------------------------------------
    // Maintenance Configuration
    // -------------------------------------------------------------------------
    /// Interval between background flush/compaction passes
    pub check_interval: Duration,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalSyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N unsynced records (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./lodekv_data"),
            level0_size: 100 * 1024 * 1024, // 100 MB
            part_size: 4,
            max_level: 10,
            wal_sync_strategy: WalSyncStrategy::EveryNEntries { count: 100 },
            wal_size_limit: 100 * 1024 * 1024, // 100 MB
            threshold: 10_000,
            check_interval: Duration::from_secs(1),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.level0_size == 0 {
            return Err(LodeError::Config("level0_size must be positive".into()));
        }
        if self.part_size == 0 {
            return Err(LodeError::Config("part_size must be positive".into()));
        }
        if self.max_level == 0 {
            return Err(LodeError::Config("max_level must be at least 1".into()));
        }
        if self.threshold == 0 {
            return Err(LodeError::Config("threshold must be positive".into()));
        }
        if self.wal_size_limit == 0 {
            return Err(LodeError::Config("wal_size_limit must be positive".into()));
        }
        if self.check_interval.is_zero() {
            return Err(LodeError::Config("check_interval must be non-zero".into()));
        }
        if let WalSyncStrategy::EveryNEntries { count: 0 } = self.wal_sync_strategy {
            return Err(LodeError::Config(
                "wal sync batch size must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the level 0 byte budget
    pub fn level0_size(mut self, bytes: u64) -> Self {
        self.config.level0_size = bytes;
        self
    }

    /// Set the per-level table count limit
    pub fn part_size(mut self, count: usize) -> Self {
        self.config.part_size = count;
        self
    }

    /// Set the deepest level
    pub fn max_level(mut self, level: usize) -> Self {
        self.config.max_level = level;
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Set the WAL size that forces a flush (in bytes)
    pub fn wal_size_limit(mut self, bytes: u64) -> Self {
        self.config.wal_size_limit = bytes;
        self
    }

    /// Set the memtable key count that triggers a flush
    pub fn threshold(mut self, count: usize) -> Self {
        self.config.threshold = count;
        self
    }

    /// Set the maintenance interval
    pub fn check_interval(mut self, interval: Duration) -> Self {
        self.config.check_interval = interval;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
