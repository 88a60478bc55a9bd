//! Immutable on-disk segments.
//!
//! A segment is a snapshot of a sealed memtable. Its identifier combines the
//! creation millisecond with a nanosecond-derived suffix so two segments
//! sealed within the same millisecond get distinct filenames; ordering among
//! segments uses only `created_at`, with the identifier as a stable
//! tie-break. Entries are never mutated after sealing.
//!
//! # File format
//!
//! ```text
//! sstable_<id>.json:
//! { "id": <string>, "created_at": <ms>, "entries": [[key, entry], ...] }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use super::entry::{Entry, Key};
use crate::errdata;
use crate::error::Result;

/// Filename prefix for segment files inside the data directory.
pub const SEGMENT_PREFIX: &str = "sstable_";
/// Filename extension for segment files.
pub const SEGMENT_EXT: &str = "json";

#[derive(Serialize, Deserialize)]
struct SegmentFile {
    id: String,
    created_at: u64,
    entries: Vec<(Key, Entry)>,
}

/// An immutable snapshot of a sealed memtable.
#[derive(Debug)]
pub struct Segment {
    id: String,
    created_at: u64,
    entries: BTreeMap<Key, Entry>,
    path: Option<PathBuf>,
}

impl Segment {
    /// Seal memtable contents into a new, not yet persisted segment.
    pub fn seal(pairs: Vec<(Key, Entry)>, created_at: u64) -> Self {
        Self {
            id: new_segment_id(created_at),
            created_at,
            entries: pairs.into_iter().collect(),
            path: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a key, skipping entries already expired at `now`. Unlike the
    /// memtable, expired entries stay on disk until compaction.
    pub fn lookup(&self, key: &str, now: u64) -> Option<Entry> {
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .cloned()
    }

    /// All entries not yet expired at `now`, tombstones included.
    pub fn list(&self, now: u64) -> Vec<(Key, Entry)> {
        self.entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired(now))
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect()
    }

    /// Raw iteration over every stored entry, for compaction merges.
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Entry)> {
        self.entries.iter()
    }

    /// Filename this segment persists under.
    pub fn file_name(&self) -> String {
        format!("{SEGMENT_PREFIX}{}.{SEGMENT_EXT}", self.id)
    }

    /// Write the segment into `dir`. The write goes to a temporary file that
    /// is renamed into place, so the segment is complete-or-absent under
    /// crash.
    pub fn persist(&mut self, dir: &Path) -> Result<()> {
        let path = dir.join(self.file_name());
        let record = SegmentFile {
            id: self.id.clone(),
            created_at: self.created_at,
            entries: self
                .entries
                .iter()
                .map(|(key, entry)| (key.clone(), entry.clone()))
                .collect(),
        };

        let tmp = path.with_extension("tmp");
        let mut file = fs::File::create(&tmp)?;
        serde_json::to_writer(&mut file, &record)?;
        file.sync_all()?;
        fs::rename(&tmp, &path)?;

        self.path = Some(path);
        Ok(())
    }

    /// Parse a segment file. Unparsable content is reported as invalid data;
    /// the caller decides whether to skip it.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let record: SegmentFile = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => return errdata!("unparsable segment {}: {e}", path.display()),
        };
        Ok(Self {
            id: record.id,
            created_at: record.created_at,
            entries: record.entries.into_iter().collect(),
            path: Some(path.to_path_buf()),
        })
    }

    /// Remove the backing file from disk.
    pub fn discard(self) -> Result<()> {
        if let Some(path) = self.path {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// Paths of all segment files in `dir`, in filename order.
pub(crate) fn segment_paths(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for dirent in fs::read_dir(dir)? {
        let path = dirent?.path();
        let name = match path.file_name().and_then(|name| name.to_str()) {
            Some(name) => name,
            None => continue,
        };
        if name.starts_with(SEGMENT_PREFIX)
            && path.extension().map_or(false, |ext| ext == SEGMENT_EXT)
        {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

static SEGMENT_SEQ: AtomicU64 = AtomicU64::new(0);

fn new_segment_id(created_at: u64) -> String {
    // Nanosecond suffix plus a process-wide sequence keeps filenames unique
    // when two segments are sealed within the same millisecond.
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    let seq = SEGMENT_SEQ.fetch_add(1, Ordering::SeqCst) & 0xffff;
    format!("{created_at}-{nanos:08x}-{seq:04x}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn sample_pairs() -> Vec<(Key, Entry)> {
        vec![
            ("a".to_string(), Entry::put(json!("1"), Some(60_000))),
            ("b".to_string(), Entry::put(json!({"n": 2}), None)),
            ("gone".to_string(), Entry::tombstone()),
        ]
    }

    #[test]
    fn test_seal_persist_load_roundtrip() {
        let dir = TempDir::new().expect("temp dir");
        let mut segment = Segment::seal(sample_pairs(), 42);
        segment.persist(dir.path()).expect("persist");

        let path = dir.path().join(segment.file_name());
        let loaded = Segment::load(&path).expect("load");

        assert_eq!(loaded.id(), segment.id());
        assert_eq!(loaded.created_at(), 42);
        assert_eq!(loaded.len(), 3);
        assert_eq!(
            loaded.lookup("b", 0).expect("entry").value,
            Some(json!({"n": 2}))
        );
    }

    #[test]
    fn test_lookup_skips_expired() {
        let pairs = vec![(
            "e".to_string(),
            Entry {
                value: Some(json!("x")),
                timestamp: 0,
                expires_at: Some(10),
            },
        )];
        let segment = Segment::seal(pairs, 0);

        assert!(segment.lookup("e", 5).is_some());
        assert!(segment.lookup("e", 10).is_none());
        // No on-disk or in-memory mutation: the entry is still stored.
        assert_eq!(segment.len(), 1);
    }

    #[test]
    fn test_list_keeps_tombstones_drops_expired() {
        let mut pairs = sample_pairs();
        pairs.push((
            "old".to_string(),
            Entry {
                value: Some(json!("stale")),
                timestamp: 0,
                expires_at: Some(1),
            },
        ));
        let segment = Segment::seal(pairs, 0);

        let listed = segment.list(1_000);
        assert_eq!(listed.len(), 3);
        assert!(listed.iter().any(|(key, entry)| key == "gone" && entry.is_tombstone()));
        assert!(!listed.iter().any(|(key, _)| key == "old"));
    }

    #[test]
    fn test_load_corrupt_file_is_invalid_data() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("sstable_broken.json");
        fs::write(&path, "{ definitely not a segment").expect("write garbage");

        assert!(matches!(Segment::load(&path), Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_discard_removes_backing_file() {
        let dir = TempDir::new().expect("temp dir");
        let mut segment = Segment::seal(sample_pairs(), 1);
        segment.persist(dir.path()).expect("persist");
        let path = dir.path().join(segment.file_name());
        assert!(path.exists());

        segment.discard().expect("discard");
        assert!(!path.exists());
    }

    #[test]
    fn test_segment_paths_ignores_foreign_files() {
        let dir = TempDir::new().expect("temp dir");
        let mut segment = Segment::seal(sample_pairs(), 1);
        segment.persist(dir.path()).expect("persist");
        fs::write(dir.path().join("wal.json"), "{}").expect("write wal");
        fs::write(dir.path().join("sstable_half.tmp"), "{}").expect("write tmp");

        let paths = segment_paths(dir.path()).expect("scan");
        assert_eq!(paths.len(), 1);
    }

    #[test]
    fn test_ids_are_unique_within_a_millisecond() {
        let a = Segment::seal(Vec::new(), 7);
        let b = Segment::seal(Vec::new(), 7);
        assert_ne!(a.id(), b.id());
    }
}
