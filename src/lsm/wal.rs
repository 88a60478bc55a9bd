//! Write-ahead log.
//!
//! The WAL is a single file holding a full serialization of the current
//! memtable, rewritten after every mutation before the operation returns.
//! Rewriting the whole table keeps recovery O(memtable size) and the format
//! trivial; the memtable capacity bounds the per-mutation write cost. A
//! successful flush rewrites the log as empty.
//!
//! # File format
//!
//! ```text
//! { "timestamp": <ms of the snapshot>, "memTable": [[key, entry], ...] }
//! ```
//!
//! Each rewrite goes to a temporary file that is renamed over the log, so a
//! crash mid-write leaves the previous snapshot intact.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::entry::{now_ms, Entry, Key};
use crate::errdata;
use crate::error::Result;

/// Well-known WAL file name inside the data directory.
pub const WAL_FILE: &str = "wal.json";

#[derive(Serialize, Deserialize)]
struct WalSnapshot {
    timestamp: u64,
    #[serde(rename = "memTable")]
    mem_table: Vec<(Key, Entry)>,
}

/// Handle to the write-ahead log file.
#[derive(Debug)]
pub struct Wal {
    path: PathBuf,
}

impl Wal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the log with a snapshot of the given memtable contents.
    pub fn rewrite(&self, pairs: &[(Key, Entry)]) -> Result<()> {
        let snapshot = WalSnapshot {
            timestamp: now_ms(),
            mem_table: pairs.to_vec(),
        };

        let tmp = self.path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp)?;
        serde_json::to_writer(&mut file, &snapshot)?;
        file.sync_all()?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Rewrite the log as empty, called after a successful flush.
    pub fn clear(&self) -> Result<()> {
        self.rewrite(&[])
    }

    /// Load the logged memtable snapshot. An absent or blank file means the
    /// memtable was empty; unparsable content is an error for the caller to
    /// log and tolerate.
    pub fn load(&self) -> Result<Option<Vec<(Key, Entry)>>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(None);
        }
        let snapshot: WalSnapshot = match serde_json::from_str(&raw) {
            Ok(snapshot) => snapshot,
            Err(e) => return errdata!("unparsable write-ahead log {}: {e}", self.path.display()),
        };
        Ok(Some(snapshot.mem_table))
    }
}
