//! Resource Cache - shared TTL cache for backend collections
//!
//! Serves cached collections instantly, coalesces concurrent fetches,
//! applies optimistic local mutations and keeps last-known-good data when
//! the backend fails.

pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod models;
pub mod resource;

pub use cache::{CacheEntry, CacheInfo, CacheStatus, CacheStore, Entity, Subscription};
pub use config::Config;
pub use error::FetchError;
pub use fetch::{AuthenticatedRequest, FetchCoordinator, ReqwestTransport};
pub use models::CacheView;
pub use resource::{CacheRegistry, ResourceCache, ResourceConfig};
