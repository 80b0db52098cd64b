//! Compaction
//!
//! Merges an overflowing level into the next one.
//!
//! A level overflows when it holds more than `part_size` tables or its files
//! exceed the level's byte budget. Merging replays the level's tables oldest
//! to newest into a scratch MemTable, so later generations overwrite earlier
//! ones, and writes the result (tombstones kept, since deeper levels may
//! still hold the key) as a single table at the next level.

use std::time::Instant;

use crate::error::Result;
use crate::memtable::MemTable;

use super::TablesTree;

impl TablesTree {
    /// Run one compaction sweep over every level
    ///
    /// Levels are visited top-down, so a merge that overflows the next level
    /// is picked up in the same sweep. The deepest level is never merged.
    /// Returns the number of levels merged.
    pub fn compaction(&mut self) -> Result<usize> {
        let mut merged = 0;

        for level in 0..self.options.max_level {
            let count = self.table_count(level);
            let size = self.level_size(level);

            if count > self.options.part_size || size > self.budget(level) {
                tracing::info!(level, tables = count, bytes = size, "Level overflow, compacting");
                self.compact_level(level)?;
                merged += 1;
            }
        }

        Ok(merged)
    }

    /// Merge every table of `level` into one new table at `level + 1`,
    /// then delete the old files
    fn compact_level(&mut self, level: usize) -> Result<()> {
        let start = Instant::now();
        let target = (level + 1).min(self.options.max_level);

        let scratch = MemTable::new();
        for node in &self.levels[level] {
            for entry in node.table.entries()? {
                scratch.apply(entry);
            }
        }

        let merged = scratch.values();
        let generation = if merged.is_empty() {
            None
        } else {
            Some(self.create_table(&merged, target)?)
        };

        // New table is in place; delete the old files oldest first. On a
        // failed delete, that table and every newer one stay in the level:
        // only a suffix of the newest generations may shadow the merged table.
        let old = std::mem::take(&mut self.levels[level]);
        let mut remaining = old.into_iter();
        let mut removed = 0;
        while let Some(node) = remaining.next() {
            if let Err(e) = node.table.destroy() {
                tracing::error!(
                    level,
                    generation = node.generation,
                    path = %node.table.path().display(),
                    error = %e,
                    "Failed to delete compacted table, keeping the rest of the level"
                );
                self.levels[level] = std::iter::once(node).chain(remaining).collect();
                return Err(e);
            }
            removed += 1;
        }

        tracing::info!(
            level,
            target,
            generation = ?generation,
            removed,
            keys = merged.len(),
            elapsed = ?start.elapsed(),
            "Compaction finished"
        );

        Ok(())
    }
}
