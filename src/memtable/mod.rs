//! MemTable Module
//!
//! In-memory ordered index for recent writes.
//!
//! ## Responsibilities
//! - Fast reads and writes in memory
//! - Tombstones for deleted keys (they must reach SSTables on flush)
//! - Track key count for flush triggers
//! - Ordered iteration for SSTable creation and compaction
//!
//! ## Data Structure Choice
//! A probabilistic skip list (max height 32, promotion p = 0.25) stored as an
//! arena of nodes, wrapped in an RwLock.

mod skiplist;
mod table;

pub use table::MemTable;
