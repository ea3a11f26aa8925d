//! Fetch Module
//!
//! Backend access for the cache: the authenticated transport seam and the
//! per-resource fetch coordinator.

mod coordinator;
mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use coordinator::{parse_collection, FetchCoordinator, FetchResult, FetchTicket, PendingFetch};
pub use transport::{AuthenticatedRequest, ReqwestTransport};
