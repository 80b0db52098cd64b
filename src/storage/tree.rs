//! Tables Tree
//!
//! Owns every SSTable, organized into numbered levels.
//!
//! ## Responsibilities
//! - Discover existing `<level>.<generation>.db` files on startup
//! - Search levels 0 → max, newest generation first within a level
//! - Create new tables from flushes and compactions
//! - Track per-level byte budgets (level i = level0 × 10^i)

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;

use crate::config::Config;
use crate::entry::{Entry, Lookup};
use crate::error::{LodeError, Result};

use super::SSTable;

/// Level layout knobs, derived from [`Config`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeOptions {
    /// Byte budget of level 0
    pub level0_size: u64,
    /// Max tables per level before compaction
    pub part_size: usize,
    /// Deepest level
    pub max_level: usize,
}

impl From<&Config> for TreeOptions {
    fn from(config: &Config) -> Self {
        Self {
            level0_size: config.level0_size,
            part_size: config.part_size,
            max_level: config.max_level,
        }
    }
}

/// A table and the generation index embedded in its filename
pub(super) struct TableNode {
    pub(super) generation: u64,
    pub(super) table: SSTable,
}

/// Manages the levels of SSTables
///
/// ## Ordering:
/// - Level 0 holds the freshest flushed data, deeper levels older data
/// - Inside a level, tables are kept by ascending generation, so the last
///   table is the newest
pub struct TablesTree {
    /// Directory where tables are stored
    dir: PathBuf,
    pub(super) options: TreeOptions,
    /// `levels[i]` holds level i, oldest generation first
    pub(super) levels: Vec<Vec<TableNode>>,
    /// Byte budget per level
    budgets: Vec<u64>,
}

impl TablesTree {
    /// Open the tree stored in `dir`, loading every table found there
    pub fn open(dir: &Path, options: TreeOptions) -> Result<Self> {
        let start = Instant::now();
        fs::create_dir_all(dir)?;

        let mut budgets = Vec::with_capacity(options.max_level + 1);
        let mut budget = options.level0_size;
        for _ in 0..=options.max_level {
            budgets.push(budget);
            budget = budget.saturating_mul(10);
        }

        let mut tree = Self {
            dir: dir.to_path_buf(),
            options,
            levels: (0..=options.max_level).map(|_| Vec::new()).collect(),
            budgets,
        };

        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && is_unfinished_table(&path) {
                tracing::warn!(path = %path.display(), "Removing unfinished table");
                fs::remove_file(&path)?;
                continue;
            }
            if !path.is_file() || path.extension().map_or(true, |ext| ext != "db") {
                continue;
            }

            match parse_table_name(&path) {
                Some((level, generation)) if level <= options.max_level => {
                    tree.load_table(&path, level, generation)?;
                }
                Some((level, _)) => {
                    tracing::warn!(
                        path = %path.display(),
                        level,
                        max_level = options.max_level,
                        "Skipping table beyond the deepest level"
                    );
                }
                None => {
                    tracing::warn!(path = %path.display(), "Skipping file with unparseable table name");
                }
            }
        }

        tracing::info!(
            dir = %dir.display(),
            tables = tree.total_tables(),
            elapsed = ?start.elapsed(),
            "Tables tree loaded"
        );

        Ok(tree)
    }

    /// Load one table file into its level, keeping generations ascending
    fn load_table(&mut self, path: &Path, level: usize, generation: u64) -> Result<()> {
        let start = Instant::now();
        let table = SSTable::load(path)?;

        let nodes = &mut self.levels[level];
        let at = nodes.partition_point(|node| node.generation <= generation);
        nodes.insert(at, TableNode { generation, table });

        tracing::debug!(path = %path.display(), elapsed = ?start.elapsed(), "Table loaded");
        Ok(())
    }

    /// Search every level, freshest data first
    ///
    /// The first table that knows the key (live or tombstoned) decides.
    pub fn search(&self, key: &str) -> Result<Lookup> {
        for level in &self.levels {
            for node in level.iter().rev() {
                let result = node.table.search(key)?;
                if result.is_resolved() {
                    return Ok(result);
                }
            }
        }

        Ok(Lookup::Absent)
    }

    /// Append `table` to the tail of `level`, returning its generation
    pub fn insert(&mut self, table: SSTable, level: usize) -> Result<u64> {
        self.check_level(level)?;
        let generation = self.next_generation(level);
        self.levels[level].push(TableNode { generation, table });
        Ok(generation)
    }

    /// Build a table from `entries` and insert it into `level`
    ///
    /// `entries` should already be sorted and free of duplicates.
    pub fn create_table(&mut self, entries: &[Entry], level: usize) -> Result<u64> {
        self.check_level(level)?;
        let generation = self.next_generation(level);
        let path = table_path(&self.dir, level, generation);

        let table = SSTable::build(&path, entries)?;
        let size = table.file_size();
        let inserted = self.insert(table, level)?;
        debug_assert_eq!(inserted, generation);

        tracing::debug!(
            level,
            generation,
            entries = entries.len(),
            bytes = size,
            "Created table"
        );
        Ok(generation)
    }

    // =========================================================================
    // Accessors (for maintenance, testing and debugging)
    // =========================================================================

    /// Generation the next table inserted into `level` will get
    pub fn next_generation(&self, level: usize) -> u64 {
        self.levels
            .get(level)
            .and_then(|nodes| nodes.last())
            .map_or(0, |node| node.generation + 1)
    }

    /// Number of tables in `level`
    pub fn table_count(&self, level: usize) -> usize {
        self.levels.get(level).map_or(0, Vec::len)
    }

    /// Number of tables across all levels
    pub fn total_tables(&self) -> usize {
        self.levels.iter().map(Vec::len).sum()
    }

    /// Total file size of `level` in bytes
    pub fn level_size(&self, level: usize) -> u64 {
        self.levels
            .get(level)
            .map_or(0, |nodes| nodes.iter().map(|n| n.table.file_size()).sum())
    }

    /// Byte budget of `level`
    pub fn budget(&self, level: usize) -> u64 {
        self.budgets.get(level).copied().unwrap_or(u64::MAX)
    }

    /// Number of levels, including empty ones
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Paths of every table, level by level, oldest first
    pub fn table_paths(&self) -> Vec<PathBuf> {
        self.levels
            .iter()
            .flatten()
            .map(|node| node.table.path().to_path_buf())
            .collect()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn check_level(&self, level: usize) -> Result<()> {
        if level >= self.levels.len() {
            return Err(LodeError::Storage(format!(
                "level {} exceeds the deepest level {}",
                level, self.options.max_level
            )));
        }
        Ok(())
    }
}

// =============================================================================
// File Naming
// =============================================================================

/// "<level>.<generation>.db" inside `dir`
pub fn table_path(dir: &Path, level: usize, generation: u64) -> PathBuf {
    dir.join(format!("{}.{}.db", level, generation))
}

/// Parse level and generation from a table filename
/// "1.42.db" → Some((1, 42))
///
/// Only the exact form [`table_path`] writes is accepted, so "01.1.db" or
/// "+1.2.db" never alias a real table.
pub fn parse_table_name(path: &Path) -> Option<(usize, u64)> {
    let name = path.file_name()?.to_str()?;
    let stem = name.strip_suffix(".db")?;
    let (level, generation) = stem.split_once('.')?;
    Some((parse_number(level)?, parse_number(generation)?))
}

/// Plain decimal without sign or leading zeros
fn parse_number<T: FromStr>(text: &str) -> Option<T> {
    let canonical = !text.is_empty()
        && text.bytes().all(|b| b.is_ascii_digit())
        && (text == "0" || !text.starts_with('0'));
    if canonical {
        text.parse().ok()
    } else {
        None
    }
}

/// A table left behind by a build that never finished ("0.3.db.tmp")
fn is_unfinished_table(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map_or(false, |name| name.ends_with(".db.tmp"))
}
