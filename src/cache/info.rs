//! Cache Info Module
//!
//! Diagnostic summary of one resource's cache entry.

use serde::Serialize;

use crate::cache::CacheEntry;

// == Cache Info ==
/// Derived diagnostics for a cache entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheInfo {
    /// Freshness window in milliseconds
    pub ttl_ms: u64,
    /// Milliseconds since the last successful fetch, None if never fetched
    pub age_ms: Option<u64>,
    /// Number of entities currently cached
    pub entry_count: usize,
}

impl CacheInfo {
    // == Constructor ==
    /// Derives the info for `entry` as seen at `now_ms`.
    pub fn from_entry(entry: &CacheEntry, now_ms: u64) -> Self {
        Self {
            ttl_ms: entry.ttl_ms,
            age_ms: entry.age_ms(now_ms),
            entry_count: entry.data.len(),
        }
    }

    // == Remaining ==
    /// Milliseconds left before the entry turns stale, zero once it has.
    pub fn remaining_ms(&self) -> Option<u64> {
        self.age_ms.map(|age| self.ttl_ms.saturating_sub(age))
    }
}
