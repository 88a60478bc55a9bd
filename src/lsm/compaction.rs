//! Compaction: merge every segment into one.
//!
//! With whole-memtable segments there is a single tier, so compaction is a
//! full merge: walk segments oldest to newest accumulating the latest entry
//! per key, drop tombstones and entries already expired when the merge
//! began, persist the result as one new segment and discard the inputs.

use std::collections::BTreeMap;

use super::entry::{now_ms, Entry, Key};
use super::segment::Segment;
use super::state::LsmState;
use crate::config::Config;
use crate::error::Result;

/// Whether the segment count has crossed the configured bound.
pub(crate) fn needs_compaction(state: &LsmState, config: &Config) -> bool {
    state.segments.read().unwrap().len() > config.max_segments
}

/// Merge all segments into one. A no-op with zero or one segment. If the
/// merged segment fails to persist, the originals are left untouched; a
/// crash after persisting but before the discards leaves extra files that
/// recovery tolerates, since the merged segment's `created_at` shadows every
/// input. Caller must hold the commit lock.
pub(crate) fn compact(config: &Config, state: &LsmState) -> Result<()> {
    let started_at = now_ms();

    let (input_count, live) = {
        let segments = state.segments.read().unwrap();
        if segments.len() <= 1 {
            return Ok(());
        }

        let mut accumulated: BTreeMap<Key, Entry> = BTreeMap::new();
        for segment in segments.iter() {
            // Oldest to newest: a later segment's entry overwrites.
            for (key, entry) in segment.iter() {
                accumulated.insert(key.clone(), entry.clone());
            }
        }

        let live: Vec<(Key, Entry)> = accumulated
            .into_iter()
            .filter(|(_, entry)| !entry.is_tombstone() && !entry.is_expired(started_at))
            .collect();
        (segments.len(), live)
    };
    let live_entries = live.len();

    let mut merged = Segment::seal(live, now_ms());
    merged.persist(&config.data_dir)?;
    let merged_id = merged.id().to_string();

    let inputs = {
        let mut segments = state.segments.write().unwrap();
        std::mem::replace(&mut *segments, vec![merged])
    };
    for segment in inputs {
        let segment_id = segment.id().to_string();
        if let Err(e) = segment.discard() {
            tracing::warn!(
                segment_id = %segment_id,
                error = %e,
                "failed to remove compacted segment file"
            );
        }
    }

    tracing::info!(
        segments_merged = input_count,
        entries = live_entries,
        segment_id = %merged_id,
        "compacted segments"
    );

    Ok(())
}
