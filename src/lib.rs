//! # LodeKV
//!
//! An embedded, single-node LSM key-value storage engine with:
//! - A skip-list MemTable for recent writes
//! - Write-Ahead Logging (WAL) replayed on restart
//! - Immutable SSTables with a resident key index
//! - Leveled compaction with geometric level budgets
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Engine                              │
//! │          (one lock per get / set / delete / pass)           │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │     WAL     │          │  MemTable   │
//!   │  (Append)   │          │ (SkipList)  │
//!   └─────────────┘          └──────┬──────┘
//!                                   │ flush
//!                                   ▼
//!                      ┌─────────────────────────┐
//!                      │       TablesTree        │
//!                      │ L0: 0.0.db 0.1.db ...   │
//!                      │ L1: 1.0.db ...          │──┐
//!                      │ ...                     │  │ compaction
//!                      └─────────────────────────┘◄─┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod entry;
pub mod codec;
pub mod wal;
pub mod memtable;
pub mod storage;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{LodeError, Result};
pub use config::Config;
pub use entry::{Entry, Lookup};
pub use engine::Engine;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of LodeKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
