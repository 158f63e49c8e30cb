//! Run-scoped state
//!
//! [`FolderCache`] and [`SeenSet`] live for exactly one reconciliation run.
//! They are created by the caller and passed in, never stored globally, so
//! two runs cannot observe each other's state.

use std::collections::{HashMap, HashSet};

use super::file_meta::FileMeta;

/// Identifier to metadata cache for ancestry lookups
///
/// Entries are never invalidated during a run.
#[derive(Debug, Default)]
pub struct FolderCache {
    entries: HashMap<String, FileMeta>,
    hits: u64,
    misses: u64,
}

impl FolderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an entry, counting the hit or miss
    pub fn get(&mut self, id: &str) -> Option<&FileMeta> {
        match self.entries.get(id) {
            Some(meta) => {
                self.hits += 1;
                Some(meta)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Insert an entry unless one already exists for the identifier
    pub fn insert(&mut self, id: String, meta: FileMeta) {
        self.entries.entry(id).or_insert(meta);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}

/// Identifiers already processed in the current run
#[derive(Debug, Default)]
pub struct SeenSet {
    ids: HashSet<String>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically check and record an identifier.
    ///
    /// Returns `true` the first time an identifier is offered.
    pub fn insert_if_new(&mut self, id: &str) -> bool {
        if self.ids.contains(id) {
            return false;
        }
        self.ids.insert(id.to_string())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// State owned by one run
#[derive(Debug, Default)]
pub struct RunState {
    pub folders: FolderCache,
    pub seen: SeenSet,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }
}
