//! Cache Module
//!
//! Shared per-resource cache entries with TTL freshness, change
//! notification and pure optimistic-mutation helpers.

mod clock;
mod entry;
mod info;
pub mod mutations;
mod store;


// Re-export public types
pub use clock::{current_timestamp_ms, Clock, ManualClock, SystemClock};
pub use entry::{CacheEntry, CacheStatus, Entity};
pub use info::CacheInfo;
pub use store::{CacheStore, Callback, Subscription};
