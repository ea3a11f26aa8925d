//! Resource Cache
//!
//! Consumer-facing handle on one cached resource. Each handle is one
//! "mount": it shares the store row and in-flight fetch with every other
//! handle for the same resource, but tracks for itself whether its last
//! read was served from cache.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::cache::mutations;
use crate::cache::{CacheEntry, CacheInfo, CacheStatus, CacheStore, Clock, Entity, Subscription};
use crate::error::{FetchError, Result};
use crate::fetch::{FetchCoordinator, FetchResult, FetchTicket};
use crate::models::CacheView;
use crate::resource::ResourceConfig;

/// Collaborators shared by every resource cache of a registry.
pub(crate) struct CacheContext {
    pub(crate) store: Arc<CacheStore>,
    pub(crate) coordinator: FetchCoordinator,
    pub(crate) clock: Arc<dyn Clock>,
}

// == Resource Cache ==
/// Cached collection for one resource, with stale-while-revalidate reads,
/// forced refresh and optimistic mutations.
pub struct ResourceCache {
    context: Arc<CacheContext>,
    config: ResourceConfig,
    /// Whether the last read handed out by this handle came from cache.
    /// Shared with this handle's subscriptions.
    served_from_cache: Arc<AtomicBool>,
}

impl ResourceCache {
    pub(crate) fn new(context: Arc<CacheContext>, config: ResourceConfig) -> Self {
        let entry = context.store.ensure(&config.name, config.ttl_ms);
        Self {
            served_from_cache: Arc::new(AtomicBool::new(entry.is_populated())),
            context,
            config,
        }
    }

    pub fn config(&self) -> &ResourceConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    // == Access ==
    /// Reads the resource the way a mounting consumer does.
    ///
    /// Returns whatever is cached right away. An Empty, Stale or Error entry
    /// also starts a background fetch, or joins the one already running;
    /// Fresh and Loading entries never trigger a request.
    pub fn access(&self) -> CacheView {
        let now = self.context.clock.now_ms();
        let entry = self.entry();
        let status = entry.status_at(now);
        self.served_from_cache.store(entry.is_populated(), Ordering::SeqCst);

        match status {
            CacheStatus::Fresh => debug!("Serving fresh '{}' from cache", self.name()),
            CacheStatus::Loading => debug!("'{}' is already loading", self.name()),
            CacheStatus::Empty | CacheStatus::Stale | CacheStatus::Error => {
                debug!("'{}' is {:?}, revalidating", self.name(), status);
                self.start_fetch();
            }
        }

        self.view()
    }

    /// Like [`access`](Self::access), but waits for the fetch when there was
    /// nothing cached to serve.
    pub async fn load(&self) -> CacheView {
        let view = self.access();
        if view.is_from_cache {
            return view;
        }
        let _ = self.settled().await;
        self.view()
    }

    // == Refresh ==
    /// Fetches regardless of freshness.
    ///
    /// Joins an in-flight fetch instead of starting a second one. On failure
    /// the error is recorded on the entry and cached data is kept.
    pub async fn refresh(&self) -> Result<Vec<Entity>> {
        self.served_from_cache.store(false, Ordering::SeqCst);
        self.start_fetch().pending.await
    }

    /// Waits for the in-flight fetch of this resource, if any.
    pub async fn settled(&self) -> Option<FetchResult> {
        let pending = self.context.coordinator.in_flight(self.name())?;
        Some(pending.await)
    }

    fn start_fetch(&self) -> FetchTicket {
        let name = self.config.name.clone();
        let ttl_ms = self.config.ttl_ms;

        let start_store = Arc::clone(&self.context.store);
        let start_name = name.clone();
        let settle_store = Arc::clone(&self.context.store);
        let settle_clock = Arc::clone(&self.context.clock);

        self.context.coordinator.fetch_resource_with(
            &self.config.name,
            &self.config.endpoint,
            move || {
                start_store.update_with_ttl(&start_name, ttl_ms, |entry| {
                    entry.status = CacheStatus::Loading
                });
            },
            move |result| {
                let now = settle_clock.now_ms();
                settle_store.update_with_ttl(&name, ttl_ms, |entry| {
                    apply_fetch_result(entry, result, now)
                });
            },
        )
    }

    // == Mutations ==
    /// Appends `item` locally. The server write must already have happened.
    pub fn add_item(&self, item: Entity) {
        self.mutate(|data| mutations::add_item(data, item));
    }

    /// Replaces the entry matching `item` on `match_field` (the resource's
    /// identifying field when None), appending it if nothing matches.
    pub fn update_item(&self, item: Entity, match_field: Option<&str>) {
        let field = match_field.unwrap_or(&self.config.id_field).to_string();
        self.mutate(|data| mutations::update_item(data, item, &field));
    }

    /// Removes entries whose `match_field` equals `identifier`. Absent
    /// identifiers are ignored.
    pub fn remove_item(&self, identifier: &Value, match_field: Option<&str>) {
        let field = match_field.unwrap_or(&self.config.id_field).to_string();
        self.mutate(|data| mutations::remove_item(data, identifier, &field));
    }

    fn mutate(&self, f: impl FnOnce(&[Entity]) -> Vec<Entity>) {
        self.served_from_cache.store(true, Ordering::SeqCst);
        self.context
            .store
            .update_with_ttl(&self.config.name, self.config.ttl_ms, |entry| {
                entry.data = f(entry.data.as_slice());
                // An in-flight fetch keeps the entry Loading until it settles
                if entry.status != CacheStatus::Loading {
                    entry.status = CacheStatus::Fresh;
                }
            });
    }

    // == Subscribe ==
    /// Calls `callback` with a fresh view after every change to this
    /// resource. Drop the returned subscription when the consumer goes away.
    ///
    /// Pushed views report `is_from_cache` from this handle, same as
    /// [`view`](Self::view).
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(CacheView) + Send + Sync + 'static,
    {
        let clock = Arc::clone(&self.context.clock);
        let served_from_cache = Arc::clone(&self.served_from_cache);
        self.context.store.subscribe(&self.config.name, move |entry| {
            let from_cache = served_from_cache.load(Ordering::SeqCst);
            callback(CacheView::from_entry(entry, clock.now_ms(), from_cache));
        })
    }

    // == Accessors ==
    /// Current snapshot, without triggering a fetch.
    pub fn view(&self) -> CacheView {
        CacheView::from_entry(
            &self.entry(),
            self.context.clock.now_ms(),
            self.is_from_cache(),
        )
    }

    pub fn data(&self) -> Vec<Entity> {
        self.entry().data
    }

    pub fn loading(&self) -> bool {
        self.entry().status == CacheStatus::Loading
    }

    pub fn error(&self) -> Option<FetchError> {
        self.entry().error
    }

    pub fn is_from_cache(&self) -> bool {
        self.served_from_cache.load(Ordering::SeqCst)
    }

    pub fn last_fetch(&self) -> Option<DateTime<Utc>> {
        self.entry().last_fetch()
    }

    pub fn cache_info(&self) -> CacheInfo {
        CacheInfo::from_entry(&self.entry(), self.context.clock.now_ms())
    }

    fn entry(&self) -> CacheEntry {
        self.context.store.ensure(&self.config.name, self.config.ttl_ms)
    }
}

/// Folds a settled fetch into the entry.
///
/// Success replaces the data and clears any error. Failure records the
/// error and leaves data and `fetched_at` untouched.
fn apply_fetch_result(entry: &mut CacheEntry, result: &FetchResult, now_ms: u64) {
    match result {
        Ok(items) => {
            entry.data = items.clone();
            entry.fetched_at = Some(now_ms);
            entry.status = CacheStatus::Fresh;
            entry.error = None;
        }
        Err(err) => {
            entry.status = CacheStatus::Error;
            entry.error = Some(err.clone());
        }
    }
}
