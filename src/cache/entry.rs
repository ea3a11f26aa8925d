//! Cache Entry Module
//!
//! Defines the per-resource cache row and its freshness rules.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::error::FetchError;

/// One element of a cached collection. The cache only looks at the
/// configured identifying field; everything else is opaque.
pub type Entity = Value;

// == Cache Status ==
/// Lifecycle state of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Nothing fetched or written yet
    Empty,
    /// A fetch is in flight
    Loading,
    /// Data is current within its TTL
    Fresh,
    /// Data is usable but its TTL has elapsed
    Stale,
    /// The last fetch failed; prior data is retained
    Error,
}

// == Cache Entry ==
/// Cached collection for a single resource, plus fetch metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Resource name this entry belongs to
    pub key: String,
    /// Collection in insertion order
    pub data: Vec<Entity>,
    /// Completion time of the last successful fetch (Unix milliseconds)
    pub fetched_at: Option<u64>,
    /// Freshness window in milliseconds
    pub ttl_ms: u64,
    /// Stored lifecycle state
    pub status: CacheStatus,
    /// Last fetch failure, cleared only by a successful fetch
    pub error: Option<FetchError>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an empty entry for `key`.
    pub fn empty(key: impl Into<String>, ttl_ms: u64) -> Self {
        Self {
            key: key.into(),
            data: Vec::new(),
            fetched_at: None,
            ttl_ms,
            status: CacheStatus::Empty,
            error: None,
        }
    }

    // == Freshness ==
    /// Status as observed at `now_ms`.
    ///
    /// A stored `Fresh` entry is only fresh while `now - fetched_at < ttl_ms`;
    /// past that it reads as `Stale`, or `Empty` if it never held data.
    pub fn status_at(&self, now_ms: u64) -> CacheStatus {
        match self.status {
            CacheStatus::Fresh if self.is_within_ttl(now_ms) => CacheStatus::Fresh,
            CacheStatus::Fresh | CacheStatus::Stale => {
                if self.fetched_at.is_none() && self.data.is_empty() {
                    CacheStatus::Empty
                } else {
                    CacheStatus::Stale
                }
            }
            other => other,
        }
    }

    /// Returns true if the entry is fresh at `now_ms`.
    pub fn is_fresh(&self, now_ms: u64) -> bool {
        self.status_at(now_ms) == CacheStatus::Fresh
    }

    fn is_within_ttl(&self, now_ms: u64) -> bool {
        match self.fetched_at {
            Some(fetched_at) => now_ms.saturating_sub(fetched_at) < self.ttl_ms,
            None => false,
        }
    }

    /// Returns true once the entry has held data, fetched or written locally.
    pub fn is_populated(&self) -> bool {
        self.fetched_at.is_some() || !self.data.is_empty()
    }

    // == Age ==
    /// Milliseconds since the last successful fetch, if there was one.
    pub fn age_ms(&self, now_ms: u64) -> Option<u64> {
        self.fetched_at.map(|fetched_at| now_ms.saturating_sub(fetched_at))
    }

    /// `fetched_at` as a UTC timestamp.
    pub fn last_fetch(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
            .and_then(|ms| i64::try_from(ms).ok())
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }
}
