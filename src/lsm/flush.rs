//! Flush: promote the memtable to an on-disk segment.

use super::compaction;
use super::entry::now_ms;
use super::segment::Segment;
use super::state::LsmState;
use crate::config::Config;
use crate::error::Result;

/// Seal the current memtable into a new segment, persist it, clear the
/// memtable and empty the WAL. A no-op on an empty memtable. Compaction runs
/// afterwards when the segment count exceeds the configured bound; its
/// failure does not fail the flush. Caller must hold the commit lock.
///
/// Failure ordering: if the segment fails to persist, memtable and WAL are
/// untouched and the error surfaces. If emptying the WAL fails after the
/// segment landed, recovery replays the WAL into the memtable; those keys
/// then exist in both tiers, which is harmless since the memtable shadows
/// segments.
pub(crate) fn flush(config: &Config, state: &LsmState) -> Result<()> {
    let pairs = {
        let memtable = state.memtable.read().unwrap();
        if memtable.is_empty() {
            return Ok(());
        }
        memtable.snapshot_pairs()
    };
    let sealed_entries = pairs.len();

    let mut segment = Segment::seal(pairs, now_ms());
    segment.persist(&config.data_dir)?;
    let segment_id = segment.id().to_string();

    state.segments.write().unwrap().push(segment);
    state.memtable.write().unwrap().clear();
    state.wal.clear()?;

    tracing::info!(
        segment_id = %segment_id,
        entries = sealed_entries,
        "flushed memtable to segment"
    );

    if compaction::needs_compaction(state, config) {
        if let Err(e) = compaction::compact(config, state) {
            tracing::warn!(error = %e, "compaction failed, keeping existing segments");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::store::LsmStore;
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn open_store(dir: &TempDir) -> LsmStore {
        let config = Config::new(dir.path()).memtable_max_size(100).max_segments(10);
        LsmStore::open_with_config(config).expect("open store")
    }

    #[test]
    fn test_flush_seals_clears_and_empties_wal() {
        let dir = TempDir::new().expect("temp dir");
        let store = open_store(&dir);

        store.put("a", json!(1), None).expect("put");
        store.put("b", json!(2), None).expect("put");

        flush(store.config(), &store.state).expect("flush");

        assert_eq!(store.state.memtable.read().unwrap().len(), 0);
        assert_eq!(store.state.segments.read().unwrap().len(), 1);
        let logged = store.state.wal.load().expect("wal load").expect("snapshot");
        assert!(logged.is_empty());
    }

    #[test]
    fn test_flush_empty_memtable_is_noop() {
        let dir = TempDir::new().expect("temp dir");
        let store = open_store(&dir);

        flush(store.config(), &store.state).expect("flush");
        flush(store.config(), &store.state).expect("flush again");

        assert_eq!(store.state.segments.read().unwrap().len(), 0);
    }

    #[test]
    fn test_flushed_data_remains_readable() {
        let dir = TempDir::new().expect("temp dir");
        let store = open_store(&dir);

        store.put("k", json!("v"), None).expect("put");
        flush(store.config(), &store.state).expect("flush");

        let entry = store.get("k").expect("get").expect("entry");
        assert_eq!(entry.value, Some(json!("v")));
    }
}
