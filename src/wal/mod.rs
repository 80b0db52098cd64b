//! Write-Ahead Log (WAL) Module
//!
//! Provides durability guarantees through append-only logging.
//!
//! ## Responsibilities
//! - Append one record per MemTable mutation, in mutation order
//! - Rebuild the MemTable on startup by replaying every record
//! - Start over from an empty file once a flush made the records redundant
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Record 1                                │
//! │ ┌──────────────┬──────────────────────┐ │
//! │ │ Len (8, LE)  │ Entry (JSON, Len B)  │ │
//! │ └──────────────┴──────────────────────┘ │
//! ├─────────────────────────────────────────┤
//! │ Record 2                                │
//! │ ┌──────────────┬──────────────────────┐ │
//! │ │ Len (8, LE)  │ Entry (JSON, Len B)  │ │
//! │ └──────────────┴──────────────────────┘ │
//! └─────────────────────────────────────────┘
//! ```
//!
//! There are no checksums; a record that cannot be framed or decoded fails
//! recovery.

mod reader;
mod recovery;
mod writer;

pub use reader::{encode_record, WalReader, LEN_PREFIX_SIZE};
pub use recovery::{RecoveryResult, WalRecovery};
pub use writer::Wal;

/// Name of the log file inside the data directory
pub const WAL_FILENAME: &str = "wal.log";
