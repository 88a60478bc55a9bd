//! LSM-tree storage engine with TTL expiry.
//!
//! The engine absorbs writes into a bounded in-memory table, seals that
//! table into immutable on-disk segments when it fills, and periodically
//! merges segments to reclaim space held by overwritten, deleted or expired
//! entries. Every mutation is recorded in a write-ahead log before it is
//! acknowledged, so state survives unclean shutdown.
//!
//! ```text
//! ┌──────────────┐  mirror   ┌──────────────┐
//! │   MemTable   │◄─────────►│     WAL      │
//! │  (BTreeMap)  │           │  (rewrite)   │
//! └──────┬───────┘           └──────────────┘
//!        │ flush (at capacity)
//!        ▼
//! ┌──────────────┐  compact  ┌──────────────┐
//! │  Segment N   │──────────►│   Segment    │
//! │  Segment ..  │  (merge)  │  (single)    │
//! │  Segment 0   │           └──────────────┘
//! └──────────────┘
//! ```
//!
//! # Write path
//!
//! 1. The entry is inserted into the memtable (a delete inserts a tombstone)
//! 2. The WAL is rewritten with the full memtable before acknowledging
//! 3. A full memtable is flushed: sealed into a segment, persisted, cleared
//! 4. When the segment count exceeds its bound, all segments merge into one
//!
//! # Read path
//!
//! 1. Check the memtable; a tombstone there is an authoritative miss
//! 2. Walk segments newest to oldest and take the first hit
//! 3. Expired entries count as absent everywhere (and are swept lazily from
//!    the memtable)
//!
//! # Durability
//!
//! WAL, segment and metadata writes all go to a temporary file renamed into
//! place, so each file is complete-or-absent after a crash. Recovery reads
//! metadata, replays the WAL into the memtable and loads every parsable
//! segment; corrupt segments are skipped and left on disk.

pub mod compaction;
pub mod entry;
pub mod flush;
pub mod memtable;
pub mod metadata;
pub mod metrics;
pub mod recovery;
pub mod segment;
pub mod state;
pub mod store;
pub mod wal;

pub use entry::{Entry, Key, Value};
pub use memtable::MemTable;
pub use metrics::Stats;
pub use segment::Segment;
pub use state::LsmState;
pub use store::LsmStore;
pub use wal::Wal;
