//! The in-memory write buffer.
//!
//! All writes land here first. The table is a plain ordered map bounded by
//! entry count; mutators are serialized by the store's commit lock, so no
//! internal synchronization is needed. Expired entries are collected lazily:
//! a lookup or listing that encounters one removes it on the spot.

use std::collections::BTreeMap;

use super::entry::{now_ms, Entry, Key};

/// Bounded in-memory Key to Entry map.
#[derive(Debug)]
pub struct MemTable {
    entries: BTreeMap<Key, Entry>,
    max_size: usize,
}

impl MemTable {
    /// Create an empty memtable with the given capacity in entries.
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            max_size,
        }
    }

    /// Insert or overwrite an entry. Returns true when the table has reached
    /// capacity and should be flushed.
    pub fn insert(&mut self, key: Key, entry: Entry) -> bool {
        self.entries.insert(key, entry);
        self.entries.len() >= self.max_size
    }

    /// Look up a key. An expired entry is removed and reported as a miss;
    /// tombstones are returned as present so the caller can stop searching
    /// older tiers.
    pub fn lookup(&mut self, key: &str) -> Option<Entry> {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(now_ms()),
            None => return None,
        };
        if expired {
            self.entries.remove(key);
            return None;
        }
        self.entries.get(key).cloned()
    }

    /// Remove a mapping outright. Public deletions go through tombstone
    /// inserts instead, so they propagate to segments via flush.
    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// All non-expired entries; expired ones are swept during the walk.
    pub fn list(&mut self) -> Vec<(Key, Entry)> {
        let now = now_ms();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        self.entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Copy of the current contents, expired entries included. This is what
    /// the WAL records and what flush seals into a segment.
    pub fn snapshot_pairs(&self) -> Vec<(Key, Entry)> {
        self.entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect()
    }

    /// Replace-or-add from a recovered snapshot.
    pub fn load_pairs(&mut self, pairs: Vec<(Key, Entry)>) {
        for (key, entry) in pairs {
            self.entries.insert(key, entry);
        }
    }
}
