//! Engine metadata file.
//!
//! Persisted on shutdown and read back on open, so configuration state that
//! outlives the process (currently the default TTL) survives restarts. The
//! field names match the on-disk schema, not Rust convention.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::entry::now_ms;
use crate::errdata;
use crate::error::Result;

/// Well-known metadata file name inside the data directory.
pub const METADATA_FILE: &str = "metadata.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(rename = "defaultTTL")]
    pub default_ttl: u64,
    #[serde(rename = "lastUpdated")]
    pub last_updated: u64,
}

impl Metadata {
    pub fn new(default_ttl: u64) -> Self {
        Self {
            default_ttl,
            last_updated: now_ms(),
        }
    }

    /// Write the metadata file via temp-and-rename.
    pub fn save(&self, dir: &Path) -> Result<()> {
        let path = dir.join(METADATA_FILE);
        let tmp = path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp)?;
        serde_json::to_writer(&mut file, self)?;
        file.sync_all()?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Read the metadata file, if present.
    pub fn load(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(METADATA_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)?;
        match serde_json::from_str(&raw) {
            Ok(metadata) => Ok(Some(metadata)),
            Err(e) => errdata!("unparsable metadata {}: {e}", path.display()),
        }
    }
}
