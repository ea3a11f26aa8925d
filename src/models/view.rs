//! What a consumer sees of a resource cache on one read.

use chrono::{DateTime, Utc};

use crate::cache::{CacheEntry, CacheInfo, CacheStatus, Entity};
use crate::error::FetchError;

/// Snapshot of a resource cache handed to a consumer.
#[derive(Debug, Clone)]
pub struct CacheView {
    /// Current collection, possibly stale or empty
    pub data: Vec<Entity>,
    /// True while a fetch is in flight
    pub loading: bool,
    /// Last fetch failure, if any
    pub error: Option<FetchError>,
    /// True when this read was served by an existing entry without this
    /// read starting a network request
    pub is_from_cache: bool,
    /// Completion time of the last successful fetch
    pub last_fetch: Option<DateTime<Utc>>,
    /// Derived diagnostics
    pub cache_info: CacheInfo,
    /// Status as observed when the snapshot was taken
    pub status: CacheStatus,
}

impl CacheView {
    /// Builds a view of `entry` as seen at `now_ms`.
    pub fn from_entry(entry: &CacheEntry, now_ms: u64, is_from_cache: bool) -> Self {
        let status = entry.status_at(now_ms);
        Self {
            data: entry.data.clone(),
            loading: status == CacheStatus::Loading,
            error: entry.error.clone(),
            is_from_cache,
            last_fetch: entry.last_fetch(),
            cache_info: CacheInfo::from_entry(entry, now_ms),
            status,
        }
    }

    /// Displayable error message, for an error banner.
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }
}
