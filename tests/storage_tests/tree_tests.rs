//! Tests for the tables tree and compaction
//!
//! These tests verify:
//! - Table discovery and generation ordering on open
//! - Read shadowing across generations and levels
//! - Level budgets
//! - Count- and size-triggered compaction

use std::fs;
use std::path::Path;

use lodekv::storage::{table_path, SSTable, TablesTree, TreeOptions};
use lodekv::{Entry, Lookup};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn options(part_size: usize) -> TreeOptions {
    TreeOptions {
        level0_size: 1024 * 1024,
        part_size,
        max_level: 3,
    }
}

fn open(dir: &Path, part_size: usize) -> TablesTree {
    TablesTree::open(dir, options(part_size)).unwrap()
}

fn put(key: &str, value: &str) -> Entry {
    Entry::put(key, value.as_bytes().to_vec())
}

fn found(key: &str, value: &str) -> Lookup {
    Lookup::Found(put(key, value))
}

// =============================================================================
// Open / Create Tests
// =============================================================================

#[test]
fn test_open_empty_directory() {
    let temp = TempDir::new().unwrap();
    let tree = open(temp.path(), 4);

    assert_eq!(tree.total_tables(), 0);
    assert_eq!(tree.level_count(), 4);
    assert_eq!(tree.search("x").unwrap(), Lookup::Absent);
}

#[test]
fn test_create_table_assigns_generations() {
    let temp = TempDir::new().unwrap();
    let mut tree = open(temp.path(), 10);

    for expected in 0..3 {
        let generation = tree.create_table(&[put("k", "v")], 0).unwrap();
        assert_eq!(generation, expected);
    }

    assert_eq!(tree.table_count(0), 3);
    for generation in 0..3 {
        assert!(table_path(temp.path(), 0, generation).exists());
    }
}

#[test]
fn test_create_table_rejects_level_past_deepest() {
    let temp = TempDir::new().unwrap();
    let mut tree = open(temp.path(), 4);

    assert!(tree.create_table(&[put("k", "v")], 4).is_err());
}

#[test]
fn test_reopen_restores_generation_order() {
    let temp = TempDir::new().unwrap();
    {
        let mut tree = open(temp.path(), 100);
        for i in 0..12 {
            tree.create_table(&[put("k", &format!("v{}", i))], 0).unwrap();
        }
    }

    let tree = open(temp.path(), 100);

    assert_eq!(tree.table_count(0), 12);
    assert_eq!(tree.next_generation(0), 12);
    // 0.11 must beat 0.2, which a lexical sort would get wrong
    assert_eq!(tree.search("k").unwrap(), found("k", "v11"));
}

#[test]
fn test_open_skips_unparseable_names() {
    let temp = TempDir::new().unwrap();
    SSTable::build(&temp.path().join("0.0.db"), &[put("a", "1")]).unwrap();
    fs::write(temp.path().join("junk.db"), b"garbage").unwrap();
    fs::write(temp.path().join("wal.log"), b"").unwrap();

    let tree = open(temp.path(), 4);

    assert_eq!(tree.total_tables(), 1);
    assert_eq!(tree.search("a").unwrap(), found("a", "1"));
}

#[test]
fn test_open_fails_on_corrupt_table() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("0.0.db"), b"short").unwrap();

    assert!(TablesTree::open(temp.path(), options(4)).is_err());
}

// =============================================================================
// Search / Shadowing Tests
// =============================================================================

#[test]
fn test_newer_generation_shadows_older() {
    let temp = TempDir::new().unwrap();
    let mut tree = open(temp.path(), 10);

    tree.create_table(&[put("a", "old"), put("b", "kept")], 0).unwrap();
    tree.create_table(&[put("a", "new")], 0).unwrap();

    assert_eq!(tree.search("a").unwrap(), found("a", "new"));
    assert_eq!(tree.search("b").unwrap(), found("b", "kept"));
}

#[test]
fn test_shallower_level_shadows_deeper() {
    let temp = TempDir::new().unwrap();
    let mut tree = open(temp.path(), 10);

    tree.create_table(&[put("a", "deep")], 2).unwrap();
    tree.create_table(&[put("a", "mid")], 1).unwrap();
    tree.create_table(&[put("a", "fresh")], 0).unwrap();

    assert_eq!(tree.search("a").unwrap(), found("a", "fresh"));
}

#[test]
fn test_tombstone_stops_search() {
    let temp = TempDir::new().unwrap();
    let mut tree = open(temp.path(), 10);

    tree.create_table(&[put("a", "1")], 1).unwrap();
    tree.create_table(&[Entry::tombstone("a")], 0).unwrap();

    assert_eq!(tree.search("a").unwrap(), Lookup::Tombstoned);
}

// =============================================================================
// Budget Tests
// =============================================================================

#[test]
fn test_budgets_grow_tenfold() {
    let temp = TempDir::new().unwrap();
    let tree = open(temp.path(), 4);

    assert_eq!(tree.budget(0), 1024 * 1024);
    assert_eq!(tree.budget(1), 10 * 1024 * 1024);
    assert_eq!(tree.budget(2), 100 * 1024 * 1024);
    assert_eq!(tree.budget(3), 1000 * 1024 * 1024);
}

#[test]
fn test_level_size_sums_file_sizes() {
    let temp = TempDir::new().unwrap();
    let mut tree = open(temp.path(), 10);

    tree.create_table(&[put("a", "1")], 0).unwrap();
    tree.create_table(&[put("b", "2")], 0).unwrap();

    let expected: u64 = tree
        .table_paths()
        .iter()
        .map(|p| fs::metadata(p).unwrap().len())
        .sum();
    assert_eq!(tree.level_size(0), expected);
    assert_eq!(tree.level_size(1), 0);
}

// =============================================================================
// Compaction Tests
// =============================================================================

#[test]
fn test_compaction_below_limits_is_noop() {
    let temp = TempDir::new().unwrap();
    let mut tree = open(temp.path(), 2);

    tree.create_table(&[put("a", "1")], 0).unwrap();
    tree.create_table(&[put("b", "2")], 0).unwrap();

    assert_eq!(tree.compaction().unwrap(), 0);
    assert_eq!(tree.table_count(0), 2);
}

#[test]
fn test_compaction_merges_level_into_next() {
    let temp = TempDir::new().unwrap();
    let mut tree = open(temp.path(), 1);

    tree.create_table(&[put("a", "1"), put("b", "old")], 0).unwrap();
    tree.create_table(&[put("b", "new"), put("c", "3")], 0).unwrap();

    assert_eq!(tree.compaction().unwrap(), 1);

    assert_eq!(tree.table_count(0), 0);
    assert_eq!(tree.table_count(1), 1);
    assert!(!table_path(temp.path(), 0, 0).exists());
    assert!(!table_path(temp.path(), 0, 1).exists());
    assert!(table_path(temp.path(), 1, 0).exists());

    assert_eq!(tree.search("a").unwrap(), found("a", "1"));
    assert_eq!(tree.search("b").unwrap(), found("b", "new"));
    assert_eq!(tree.search("c").unwrap(), found("c", "3"));

    let merged = SSTable::load(&table_path(temp.path(), 1, 0)).unwrap();
    assert_eq!(merged.entry_count(), 3);
}

#[test]
fn test_compaction_keeps_newer_tombstone() {
    let temp = TempDir::new().unwrap();
    let mut tree = open(temp.path(), 1);

    tree.create_table(&[put("gone", "x")], 2).unwrap();
    tree.create_table(&[put("gone", "y")], 0).unwrap();
    tree.create_table(&[Entry::tombstone("gone")], 0).unwrap();

    tree.compaction().unwrap();

    assert_eq!(tree.search("gone").unwrap(), Lookup::Tombstoned);
}

#[test]
fn test_compaction_result_survives_reopen() {
    let temp = TempDir::new().unwrap();
    {
        let mut tree = open(temp.path(), 1);
        tree.create_table(&[put("a", "1")], 0).unwrap();
        tree.create_table(&[put("a", "2")], 0).unwrap();
        tree.compaction().unwrap();
    }

    let tree = open(temp.path(), 1);

    assert_eq!(tree.table_count(0), 0);
    assert_eq!(tree.table_count(1), 1);
    assert_eq!(tree.search("a").unwrap(), found("a", "2"));
}

#[test]
fn test_size_triggered_compaction() {
    let temp = TempDir::new().unwrap();
    let mut tree = TablesTree::open(
        temp.path(),
        TreeOptions {
            level0_size: 64,
            part_size: 100,
            max_level: 3,
        },
    )
    .unwrap();

    let entries: Vec<Entry> = (0..20)
        .map(|i| put(&format!("key{:02}", i), "some value"))
        .collect();
    tree.create_table(&entries, 0).unwrap();
    assert!(tree.level_size(0) > tree.budget(0));

    assert!(tree.compaction().unwrap() >= 1);

    assert_eq!(tree.table_count(0), 0);
    assert_eq!(tree.search("key07").unwrap(), found("key07", "some value"));
}

#[test]
fn test_compaction_cascades_in_one_sweep() {
    let temp = TempDir::new().unwrap();
    let mut tree = open(temp.path(), 1);

    tree.create_table(&[put("a", "1")], 1).unwrap();
    tree.create_table(&[put("b", "2")], 0).unwrap();
    tree.create_table(&[put("c", "3")], 0).unwrap();

    // Level 0 merges into level 1, which then holds two tables and merges on
    assert_eq!(tree.compaction().unwrap(), 2);

    assert_eq!(tree.table_count(0), 0);
    assert_eq!(tree.table_count(1), 0);
    assert_eq!(tree.table_count(2), 1);
    for (key, value) in [("a", "1"), ("b", "2"), ("c", "3")] {
        assert_eq!(tree.search(key).unwrap(), found(key, value));
    }
}

#[test]
fn test_deepest_level_never_compacted() {
    let temp = TempDir::new().unwrap();
    let mut tree = open(temp.path(), 1);

    for i in 0..4 {
        tree.create_table(&[put("k", &i.to_string())], 3).unwrap();
    }

    assert_eq!(tree.compaction().unwrap(), 0);
    assert_eq!(tree.table_count(3), 4);
    assert_eq!(tree.search("k").unwrap(), found("k", "3"));
}

#[test]
fn test_merge_of_only_empty_tables_creates_nothing() {
    let temp = TempDir::new().unwrap();
    let mut tree = open(temp.path(), 1);

    tree.create_table(&[], 0).unwrap();
    tree.create_table(&[], 0).unwrap();

    assert_eq!(tree.compaction().unwrap(), 1);
    assert_eq!(tree.total_tables(), 0);
}

#[test]
fn test_failed_delete_during_compaction_keeps_newest_tables() {
    let temp = TempDir::new().unwrap();
    let mut tree = open(temp.path(), 1);

    tree.create_table(&[put("a", "v0"), put("b", "b0")], 0).unwrap();
    tree.create_table(&[put("a", "v1")], 0).unwrap();
    tree.create_table(&[put("c", "c2")], 0).unwrap();

    // A non-empty directory in place of 0.1.db makes its delete fail
    let blocked = table_path(temp.path(), 0, 1);
    fs::remove_file(&blocked).unwrap();
    fs::create_dir(&blocked).unwrap();
    fs::write(blocked.join("keep"), b"x").unwrap();

    assert!(tree.compaction().is_err());

    // 0.0 is gone, 0.1 and 0.2 stay on top of the merged table
    assert!(!table_path(temp.path(), 0, 0).exists());
    assert_eq!(tree.table_count(0), 2);
    assert_eq!(tree.table_count(1), 1);
    assert_eq!(tree.search("a").unwrap(), found("a", "v1"));
    assert_eq!(tree.search("b").unwrap(), found("b", "b0"));
    assert_eq!(tree.search("c").unwrap(), found("c", "c2"));

    // New flushes keep counting from the surviving tail
    fs::remove_dir_all(&blocked).unwrap();
    assert_eq!(tree.create_table(&[put("a", "v3")], 0).unwrap(), 3);
    assert_eq!(tree.search("a").unwrap(), found("a", "v3"));
    drop(tree);

    let tree = open(temp.path(), 1);
    assert_eq!(tree.search("a").unwrap(), found("a", "v3"));
    assert_eq!(tree.search("b").unwrap(), found("b", "b0"));
    assert_eq!(tree.search("c").unwrap(), found("c", "c2"));
}

// =============================================================================
// File Naming Tests
// =============================================================================

#[test]
fn test_open_ignores_non_canonical_names() {
    let temp = TempDir::new().unwrap();
    SSTable::build(&temp.path().join("0.0.db"), &[put("a", "real")]).unwrap();
    SSTable::build(&temp.path().join("00.0.db"), &[put("a", "alias")]).unwrap();
    SSTable::build(&temp.path().join("+0.+1.db"), &[put("a", "alias")]).unwrap();

    let tree = open(temp.path(), 4);

    assert_eq!(tree.total_tables(), 1);
    assert_eq!(tree.search("a").unwrap(), found("a", "real"));
}

#[test]
fn test_open_removes_unfinished_tables() {
    let temp = TempDir::new().unwrap();
    let leftover = temp.path().join("0.3.db.tmp");
    fs::write(&leftover, b"half a table").unwrap();

    let tree = open(temp.path(), 4);

    assert_eq!(tree.total_tables(), 0);
    assert!(!leftover.exists());
}
