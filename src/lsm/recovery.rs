//! Recovery: rebuild engine state from the data directory.
//!
//! Best effort by design. Metadata and WAL problems fall back to defaults
//! and an empty memtable; a corrupt segment is skipped with a diagnostic and
//! left on disk untouched for inspection. Recovery never deletes files.

use std::fs;

use super::memtable::MemTable;
use super::metadata::Metadata;
use super::segment::{segment_paths, Segment};
use super::state::LsmState;
use super::wal::{Wal, WAL_FILE};
use crate::config::Config;
use crate::error::Result;

/// Restore state from metadata, WAL and segment files.
pub(crate) fn recover_state(config: &Config) -> Result<LsmState> {
    fs::create_dir_all(&config.data_dir)?;

    let default_ttl = match Metadata::load(&config.data_dir) {
        Ok(Some(metadata)) => metadata.default_ttl,
        Ok(None) => config.default_ttl_ms,
        Err(e) => {
            tracing::warn!(error = %e, "unreadable metadata, using configured default TTL");
            config.default_ttl_ms
        }
    };

    let wal = Wal::new(config.data_dir.join(WAL_FILE));
    let mut memtable = MemTable::new(config.memtable_max_size);
    match wal.load() {
        Ok(Some(pairs)) => memtable.load_pairs(pairs),
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(error = %e, "unreadable write-ahead log, starting with an empty memtable");
        }
    }

    let mut segments = Vec::new();
    for path in segment_paths(&config.data_dir)? {
        match Segment::load(&path) {
            Ok(segment) => segments.push(segment),
            Err(e) => {
                // Left on disk for the operator to inspect.
                tracing::warn!(path = %path.display(), error = %e, "skipping corrupt segment");
            }
        }
    }
    segments.sort_by(|a, b| {
        a.created_at()
            .cmp(&b.created_at())
            .then_with(|| a.id().cmp(b.id()))
    });

    tracing::info!(
        segments = segments.len(),
        memtable_entries = memtable.len(),
        "recovered storage engine state"
    );

    Ok(LsmState::new(memtable, segments, wal, default_ttl))
}

#[cfg(test)]
mod tests {
    use super::super::entry::Entry;
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_recover_fresh_directory() {
        let dir = TempDir::new().expect("temp dir");
        let config = Config::new(dir.path());

        let state = recover_state(&config).expect("recover");

        assert!(state.memtable.read().unwrap().is_empty());
        assert!(state.segments.read().unwrap().is_empty());
        assert_eq!(state.default_ttl, config.default_ttl_ms);
    }

    #[test]
    fn test_recover_replays_wal() {
        let dir = TempDir::new().expect("temp dir");
        let config = Config::new(dir.path());

        let wal = Wal::new(dir.path().join(WAL_FILE));
        wal.rewrite(&[("p".to_string(), Entry::put(json!("q"), None))])
            .expect("rewrite");

        let state = recover_state(&config).expect("recover");

        let mut memtable = state.memtable.write().unwrap();
        assert_eq!(memtable.len(), 1);
        assert_eq!(
            memtable.lookup("p").expect("entry").value,
            Some(json!("q"))
        );
    }

    #[test]
    fn test_recover_restores_default_ttl_from_metadata() {
        let dir = TempDir::new().expect("temp dir");
        Metadata::new(12_345).save(dir.path()).expect("save");

        let state = recover_state(&Config::new(dir.path())).expect("recover");
        assert_eq!(state.default_ttl, 12_345);
    }

    #[test]
    fn test_recover_skips_corrupt_segment_and_keeps_file() {
        let dir = TempDir::new().expect("temp dir");
        let mut good = Segment::seal(
            vec![("a".to_string(), Entry::put(json!(1), None))],
            1,
        );
        good.persist(dir.path()).expect("persist");
        let corrupt_path = dir.path().join("sstable_corrupt.json");
        fs::write(&corrupt_path, "{ broken").expect("write garbage");

        let state = recover_state(&Config::new(dir.path())).expect("recover");

        assert_eq!(state.segments.read().unwrap().len(), 1);
        assert!(corrupt_path.exists());
    }

    #[test]
    fn test_recovered_segments_are_sorted_by_creation() {
        let dir = TempDir::new().expect("temp dir");
        // Persist out of order; recovery must sort by created_at.
        let mut newer = Segment::seal(Vec::new(), 200);
        newer.persist(dir.path()).expect("persist");
        let mut older = Segment::seal(Vec::new(), 100);
        older.persist(dir.path()).expect("persist");

        let state = recover_state(&Config::new(dir.path())).expect("recover");

        let segments = state.segments.read().unwrap();
        assert_eq!(segments.len(), 2);
        assert!(segments[0].created_at() < segments[1].created_at());
    }
}
