//! Arena-backed skip list
//!
//! Nodes live in a `Vec` and forward links are indices into it, so the
//! structure needs no raw pointers. Nodes are never unlinked: a deletion is
//! recorded by replacing the node's entry with a tombstone.
//!
//! ```text
//! level 2: head ──────────────► [c] ─────────────────────► None
//! level 1: head ──► [a] ──────► [c] ──────► [e] ─────────► None
//! level 0: head ──► [a] ► [b] ► [c] ► [d] ► [e] ► [f] ───► None
//! ```

use rand::Rng;

use crate::entry::Entry;

/// Maximum tower height
pub(crate) const MAX_LEVEL: usize = 32;

/// Probability of promoting a node one level up
const P_FACTOR: f64 = 0.25;

/// Index of the next node, `None` at the end of a level
type Link = Option<usize>;

struct Node {
    entry: Entry,
    forward: Vec<Link>,
}

pub(crate) struct SkipList {
    /// Forward links of the head sentinel, one per level
    head: [Link; MAX_LEVEL],
    nodes: Vec<Node>,
    /// Number of levels currently in use
    level: usize,
}

impl SkipList {
    pub fn new() -> Self {
        Self {
            head: [None; MAX_LEVEL],
            nodes: Vec::new(),
            level: 0,
        }
    }

    /// Number of distinct keys, tombstones included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.find(key).map(|idx| &self.nodes[idx].entry)
    }

    /// Insert `entry`, or replace the entry already stored under its key.
    ///
    /// Returns the replaced entry.
    pub fn upsert(&mut self, entry: Entry) -> Option<Entry> {
        let update = self.predecessors(&entry.key);

        if let Some(idx) = self.next_at(update[0], 0) {
            if self.nodes[idx].entry.key == entry.key {
                return Some(std::mem::replace(&mut self.nodes[idx].entry, entry));
            }
        }

        let height = random_level();
        self.level = self.level.max(height);

        let id = self.nodes.len();
        let forward = (0..height)
            .map(|lvl| self.next_at(update[lvl], lvl))
            .collect();
        self.nodes.push(Node { entry, forward });

        for (lvl, prev) in update.iter().enumerate().take(height) {
            self.set_next(*prev, lvl, Some(id));
        }

        None
    }

    /// Entries in ascending key order
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            cursor: self.head[0],
        }
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn find(&self, key: &str) -> Option<usize> {
        let update = self.predecessors(key);
        self.next_at(update[0], 0)
            .filter(|&idx| self.nodes[idx].entry.key == key)
    }

    /// For every level, the last node whose key is strictly less than `key`
    /// (`None` stands for the head sentinel).
    fn predecessors(&self, key: &str) -> [Link; MAX_LEVEL] {
        let mut update = [None; MAX_LEVEL];
        let mut current: Link = None;

        for level in (0..self.level).rev() {
            while let Some(next) = self.next_at(current, level) {
                if self.nodes[next].entry.key.as_str() < key {
                    current = Some(next);
                } else {
                    break;
                }
            }
            update[level] = current;
        }

        update
    }

    fn next_at(&self, idx: Link, level: usize) -> Link {
        match idx {
            Some(i) => self.nodes[i].forward[level],
            None => self.head[level],
        }
    }

    fn set_next(&mut self, idx: Link, level: usize, next: Link) {
        match idx {
            Some(i) => self.nodes[i].forward[level] = next,
            None => self.head[level] = next,
        }
    }
}

impl Default for SkipList {
    fn default() -> Self {
        Self::new()
    }
}

fn random_level() -> usize {
    let mut rng = rand::thread_rng();
    let mut level = 1;
    while level < MAX_LEVEL && rng.gen::<f64>() < P_FACTOR {
        level += 1;
    }
    level
}

/// Level-0 walk over a [`SkipList`]
pub(crate) struct Iter<'a> {
    list: &'a SkipList,
    cursor: Link,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Entry;

    fn next(&mut self) -> Option<Self::Item> {
        let node = &self.list.nodes[self.cursor?];
        self.cursor = node.forward[0];
        Some(&node.entry)
    }
}
