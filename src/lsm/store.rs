//! The storage engine façade.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use super::entry::{now_ms, Entry, Key, Value};
use super::metadata::Metadata;
use super::metrics::{self, Stats};
use super::state::LsmState;
use super::{flush, recovery};
use crate::config::Config;
use crate::errinput;
use crate::error::Result;
use crate::flock::DirLock;

const LOCK_FILE: &str = "emberkv.lock";

/// An LSM-tree key-value store with TTL expiry.
///
/// Writes land in a bounded memtable mirrored by a write-ahead log; a full
/// memtable is sealed into an immutable on-disk segment, and segments are
/// periodically compacted into one. Reads merge the memtable with segments
/// newest to oldest. Mutators are serialized internally; reads only take
/// short-lived locks, so the store can be shared behind an `Arc`.
pub struct LsmStore {
    config: Config,
    _lock: DirLock,
    pub(crate) state: Arc<LsmState>,
}

impl LsmStore {
    /// Open or create a store in `data_dir` with default configuration.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(Config::new(data_dir.as_ref()))
    }

    /// Open or create a store, recovering any previous state from the data
    /// directory. The directory is locked for the lifetime of the store.
    pub fn open_with_config(config: Config) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        let lock = DirLock::acquire(config.data_dir.join(LOCK_FILE))?;
        let state = Arc::new(recovery::recover_state(&config)?);

        tracing::info!(dir = %config.data_dir.display(), "opened storage engine");
        Ok(Self {
            config,
            _lock: lock,
            state,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Store a value under a key. Without an explicit TTL the configured
    /// default applies; a TTL of zero means no expiry. The write is durable
    /// in the WAL before this returns. On an IO failure the in-memory write
    /// is kept, so a retry observes the actual post-state.
    pub fn put(&self, key: &str, value: Value, ttl_ms: Option<u64>) -> Result<()> {
        if key.is_empty() {
            return errinput!("key must not be empty");
        }
        if value.is_null() {
            return errinput!("null values are reserved for deletions, use delete");
        }

        let _commit = self.state.commit_lock.lock().unwrap();
        let ttl = ttl_ms.unwrap_or(self.state.default_ttl);
        let entry = Entry::put(value, if ttl == 0 { None } else { Some(ttl) });
        self.apply(key.to_string(), entry)
    }

    /// Delete a key by writing a tombstone, so the deletion shadows older
    /// values in segments until compaction drops both. Succeeds whether or
    /// not the key exists.
    pub fn delete(&self, key: &str) -> Result<()> {
        if key.is_empty() {
            return errinput!("key must not be empty");
        }

        let _commit = self.state.commit_lock.lock().unwrap();
        self.apply(key.to_string(), Entry::tombstone())
    }

    // Insert one entry, mirror the memtable into the WAL, flush at capacity.
    // Caller must hold the commit lock.
    fn apply(&self, key: Key, entry: Entry) -> Result<()> {
        let full = self.state.memtable.write().unwrap().insert(key, entry);

        let pairs = self.state.memtable.read().unwrap().snapshot_pairs();
        self.state.wal.rewrite(&pairs)?;

        if full {
            flush::flush(&self.config, &self.state)?;
        }
        Ok(())
    }

    /// Look up a key: memtable first, then segments newest to oldest. The
    /// first tier holding the key answers; a tombstone there is a miss.
    /// Expired entries count as absent.
    pub fn get(&self, key: &str) -> Result<Option<Entry>> {
        let from_memtable = self.state.memtable.write().unwrap().lookup(key);
        if let Some(entry) = from_memtable {
            return Ok(if entry.is_tombstone() { None } else { Some(entry) });
        }

        let now = now_ms();
        let segments = self.state.segments.read().unwrap();
        for segment in segments.iter().rev() {
            if let Some(entry) = segment.lookup(key, now) {
                return Ok(if entry.is_tombstone() { None } else { Some(entry) });
            }
        }
        Ok(None)
    }

    /// Merge view of every live entry: segments oldest to newest, memtable
    /// last, so newer tiers overwrite; tombstones then drop out.
    pub fn list(&self) -> Result<Vec<(Key, Entry)>> {
        let now = now_ms();
        let mut accumulated: BTreeMap<Key, Entry> = BTreeMap::new();

        {
            let segments = self.state.segments.read().unwrap();
            for segment in segments.iter() {
                for (key, entry) in segment.list(now) {
                    accumulated.insert(key, entry);
                }
            }
        }
        for (key, entry) in self.state.memtable.write().unwrap().list() {
            accumulated.insert(key, entry);
        }

        Ok(accumulated
            .into_iter()
            .filter(|(_, entry)| !entry.is_tombstone())
            .collect())
    }

    /// Point-in-time statistics snapshot.
    pub fn stats(&self) -> Result<Stats> {
        metrics::collect(&self.config, &self.state)
    }

    /// Flush any buffered writes and persist metadata, leaving the data
    /// directory sufficient to reconstruct full state. Idempotent and best
    /// effort: failures are logged, never returned.
    pub fn shutdown(&self) -> Result<()> {
        let _commit = self.state.commit_lock.lock().unwrap();

        if let Err(e) = flush::flush(&self.config, &self.state) {
            tracing::error!(error = %e, "failed to flush during shutdown");
        }
        if let Err(e) = Metadata::new(self.state.default_ttl).save(&self.config.data_dir) {
            tracing::error!(error = %e, "failed to persist metadata during shutdown");
        }

        tracing::info!("storage engine shut down");
        Ok(())
    }
}
