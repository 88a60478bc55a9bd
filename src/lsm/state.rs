//! Shared mutable state for the storage engine.
//!
//! Reads take the individual `RwLock`s; every mutator additionally holds
//! `commit_lock` for its whole critical section, which serializes the
//! memtable-insert, WAL-rewrite, flush and compaction sequence against other
//! mutators while leaving readers free to interleave.

use std::sync::{Mutex, RwLock};

use super::memtable::MemTable;
use super::segment::Segment;
use super::wal::Wal;

pub struct LsmState {
    /// Current write buffer.
    pub memtable: RwLock<MemTable>,

    /// Immutable segments, sorted by (`created_at`, `id`) ascending. Later
    /// segments shadow earlier ones; the memtable shadows them all.
    pub segments: RwLock<Vec<Segment>>,

    /// Write-ahead log mirroring the memtable.
    pub wal: Wal,

    /// TTL applied to writes without an explicit one. Restored from the
    /// metadata file on open, fixed for the engine's lifetime.
    pub default_ttl: u64,

    /// Serializes put/delete/flush/compact/shutdown.
    pub commit_lock: Mutex<()>,
}

impl LsmState {
    pub fn new(memtable: MemTable, segments: Vec<Segment>, wal: Wal, default_ttl: u64) -> Self {
        Self {
            memtable: RwLock::new(memtable),
            segments: RwLock::new(segments),
            wal,
            default_ttl,
            commit_lock: Mutex::new(()),
        }
    }
}
