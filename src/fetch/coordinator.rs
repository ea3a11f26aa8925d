//! Fetch Coordinator
//!
//! Deduplicates concurrent collection fetches per resource. The coordinator
//! never caches results; writing them back is the caller's job, done through
//! the settle hook of the call that started the fetch.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::cache::Entity;
use crate::error::{FetchError, Result};
use crate::fetch::AuthenticatedRequest;
use crate::models::RequestOptions;

/// Outcome of one fetch cycle, shared by every caller that joined it.
pub type FetchResult = Result<Vec<Entity>>;

/// Cloneable handle on an in-flight fetch.
pub type PendingFetch = Shared<BoxFuture<'static, FetchResult>>;

type InFlight = Arc<Mutex<HashMap<String, PendingFetch>>>;

// == Fetch Ticket ==
/// Result of asking the coordinator for a resource.
pub struct FetchTicket {
    /// Resolves with the coalesced outcome
    pub pending: PendingFetch,
    /// True if this call started the network request, false if it joined one
    pub started: bool,
}

// == Fetch Coordinator ==
/// At most one in-flight fetch per resource key.
///
/// Requests run on their own task, so dropping every waiter does not cancel
/// the fetch. The in-flight slot is cleared once the fetch settles, success
/// or failure, so later calls start a new request.
pub struct FetchCoordinator {
    transport: Arc<dyn AuthenticatedRequest>,
    in_flight: InFlight,
}

impl FetchCoordinator {
    // == Constructor ==
    pub fn new(transport: Arc<dyn AuthenticatedRequest>) -> Self {
        Self {
            transport,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    // == Fetch Resource ==
    /// Fetches the collection at `endpoint` for `key`, joining an in-flight
    /// fetch for the same key if there is one.
    pub fn fetch_resource(&self, key: &str, endpoint: &str) -> PendingFetch {
        self.fetch_resource_with(key, endpoint, || {}, |_| {}).pending
    }

    /// Like [`fetch_resource`](Self::fetch_resource), with lifecycle hooks
    /// that only run when this call starts the fetch.
    ///
    /// `on_start` runs on the calling thread before the request is sent.
    /// `on_settle` runs exactly once with the outcome, before any waiter
    /// observes it and before the in-flight slot is cleared.
    ///
    /// Must be called within a Tokio runtime.
    pub fn fetch_resource_with<S, F>(
        &self,
        key: &str,
        endpoint: &str,
        on_start: S,
        on_settle: F,
    ) -> FetchTicket
    where
        S: FnOnce(),
        F: FnOnce(&FetchResult) + Send + 'static,
    {
        let (go_tx, go_rx) = oneshot::channel::<()>();

        let pending = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(pending) = in_flight.get(key) {
                debug!("Joining in-flight fetch for '{}'", key);
                return FetchTicket {
                    pending: pending.clone(),
                    started: false,
                };
            }

            let transport = Arc::clone(&self.transport);
            let slots = Arc::clone(&self.in_flight);
            let key_owned = key.to_string();
            let endpoint_owned = endpoint.to_string();

            let handle = tokio::spawn(async move {
                // Frees the slot on every exit, including a panicking hook
                let _slot = SlotGuard {
                    slots,
                    key: key_owned.clone(),
                };
                // Hold the request until the starter has run `on_start`
                let _ = go_rx.await;

                info!("Fetching '{}' from {}", key_owned, endpoint_owned);
                let result = request_collection(transport.as_ref(), &endpoint_owned).await;
                match &result {
                    Ok(items) => info!("Fetched {} items for '{}'", items.len(), key_owned),
                    Err(e) => warn!("Fetch for '{}' failed: {}", key_owned, e),
                }

                on_settle(&result);
                result
            });

            let pending: PendingFetch = async move {
                handle.await.unwrap_or_else(|e| {
                    Err(FetchError::Network(format!("Fetch task terminated: {}", e)))
                })
            }
            .boxed()
            .shared();

            in_flight.insert(key.to_string(), pending.clone());
            pending
        };

        on_start();
        let _ = go_tx.send(());

        FetchTicket {
            pending,
            started: true,
        }
    }

    // == In Flight ==
    /// The pending fetch for `key`, if one is running.
    pub fn in_flight(&self, key: &str) -> Option<PendingFetch> {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Returns true while a fetch for `key` is running.
    pub fn is_in_flight(&self, key: &str) -> bool {
        self.in_flight(key).is_some()
    }
}

/// Clears an in-flight slot when the fetch task ends.
struct SlotGuard {
    slots: InFlight,
    key: String,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

/// GETs `endpoint` and parses the body as a collection of entities.
async fn request_collection(
    transport: &dyn AuthenticatedRequest,
    endpoint: &str,
) -> FetchResult {
    let response = transport
        .request(endpoint, RequestOptions::get())
        .await?
        .error_for_status()?;

    parse_collection(response.json()?)
}

/// Accepts only a JSON array of objects.
pub fn parse_collection(value: Value) -> FetchResult {
    match value {
        Value::Array(items) => {
            if let Some(index) = items.iter().position(|item| !item.is_object()) {
                return Err(FetchError::Parse(format!(
                    "Collection element {} is not an object",
                    index
                )));
            }
            Ok(items)
        }
        other => Err(FetchError::Parse(format!(
            "Expected a JSON array, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
