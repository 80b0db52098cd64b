//! Storage Module
//!
//! Persistent storage layer: immutable SSTables arranged in levels.
//!
//! ## Responsibilities
//! - Persist flushed MemTables as level-0 tables
//! - Point lookups across levels with correct shadowing
//! - Merge overflowing levels into the next level (compaction)
//!
//! ## Directory Layout
//! ```text
//! {data_dir}/
//!   ├── wal.log
//!   ├── 0.0.db   0.1.db   ...   (level 0, newest has the highest generation)
//!   ├── 1.0.db   ...            (level 1)
//!   └── ...
//! ```

mod compaction;
mod sstable;
mod tree;

pub use sstable::{MetaInfo, Position, SSTable, SSTableBuilder, TRAILER_SIZE};
pub use tree::{parse_table_name, table_path, TablesTree, TreeOptions};
