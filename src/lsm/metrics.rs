//! Engine statistics.

use std::path::PathBuf;

use super::segment::segment_paths;
use super::state::LsmState;
use crate::config::Config;
use crate::error::Result;

/// Point-in-time snapshot of engine state, for monitoring and debugging.
/// `total_entries` counts stored entries (memtable plus every segment,
/// shadowed and tombstoned ones included), matching the physical view the
/// file counts give.
#[derive(Debug, Clone)]
pub struct Stats {
    pub memtable_size: usize,
    pub segments_count: usize,
    pub total_entries: usize,
    pub default_ttl_ms: u64,
    pub on_disk_segment_files: usize,
    pub data_dir: PathBuf,
}

/// Collect a stats snapshot from the live state and the data directory.
pub(crate) fn collect(config: &Config, state: &LsmState) -> Result<Stats> {
    let memtable_size = state.memtable.read().unwrap().len();
    let (segments_count, stored_in_segments) = {
        let segments = state.segments.read().unwrap();
        (
            segments.len(),
            segments.iter().map(|segment| segment.len()).sum::<usize>(),
        )
    };
    let on_disk_segment_files = segment_paths(&config.data_dir)?.len();

    Ok(Stats {
        memtable_size,
        segments_count,
        total_entries: memtable_size + stored_in_segments,
        default_ttl_ms: state.default_ttl,
        on_disk_segment_files,
        data_dir: config.data_dir.clone(),
    })
}
