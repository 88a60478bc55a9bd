//! The entry record stored under every key.
//!
//! An entry couples the caller's payload with the wall-clock millisecond it
//! was accepted and an optional expiry instant. A `None` payload is the
//! tombstone sentinel: it marks a deletion so the delete can shadow older
//! values in on-disk segments until compaction drops both.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Key type. Keys are opaque non-empty strings matched by equality.
pub type Key = String;

/// Value type. Payloads are arbitrary JSON, stored and returned verbatim;
/// JSON null is reserved as the tombstone sentinel.
pub type Value = serde_json::Value;

/// A single versioned record: payload (or tombstone), creation timestamp,
/// and optional expiry. All timestamps are wall-clock milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub value: Option<Value>,
    pub timestamp: u64,
    pub expires_at: Option<u64>,
}

impl Entry {
    /// Create an entry for a write. A zero or absent TTL means no expiry.
    pub fn put(value: Value, ttl_ms: Option<u64>) -> Self {
        let now = now_ms();
        Self {
            value: Some(value),
            timestamp: now,
            expires_at: ttl_ms.filter(|ttl| *ttl > 0).map(|ttl| now + ttl),
        }
    }

    /// Create a tombstone marking a deletion. Tombstones never expire; they
    /// are removed by compaction.
    pub fn tombstone() -> Self {
        Self {
            value: None,
            timestamp: now_ms(),
            expires_at: None,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        self.value.is_none()
    }

    pub fn is_expired(&self, now: u64) -> bool {
        self.expires_at.map_or(false, |at| now >= at)
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
