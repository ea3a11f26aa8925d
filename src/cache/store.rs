//! Cache Store Module
//!
//! Process-wide table of cache entries, one row per resource, with change
//! notification. The store never performs I/O.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use tracing::{debug, info};

use crate::cache::CacheEntry;

/// Callback invoked with the new entry after every write to its key.
pub type Callback = Arc<dyn Fn(&CacheEntry) + Send + Sync>;

struct Subscriber {
    id: u64,
    callback: Callback,
}

// == Cache Store ==
/// Keyed cache entries shared by every consumer of a resource.
///
/// Writes replace an entry atomically under the table lock; subscribers are
/// notified after the lock is released so callbacks may read the store.
pub struct CacheStore {
    /// Resource name -> entry
    entries: RwLock<HashMap<String, CacheEntry>>,
    /// Resource name -> registered callbacks
    subscribers: Mutex<HashMap<String, Vec<Subscriber>>>,
    next_subscriber_id: AtomicU64,
    /// TTL for rows created lazily by `get`
    default_ttl_ms: u64,
}

impl CacheStore {
    // == Constructor ==
    /// Creates an empty store. `default_ttl_ms` applies to rows created on
    /// first access without an explicit TTL.
    pub fn new(default_ttl_ms: u64) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            subscribers: Mutex::new(HashMap::new()),
            next_subscriber_id: AtomicU64::new(1),
            default_ttl_ms,
        }
    }

    // == Get ==
    /// Returns the entry for `key`, creating an empty one on first access.
    pub fn get(&self, key: &str) -> CacheEntry {
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(entry) = entries.get(key) {
                return entry.clone();
            }
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let default_ttl_ms = self.default_ttl_ms;
        entries
            .entry(key.to_string())
            .or_insert_with(|| CacheEntry::empty(key, default_ttl_ms))
            .clone()
    }

    /// Returns the entry for `key`, creating it with `ttl_ms` if absent.
    ///
    /// An existing row keeps its data but adopts `ttl_ms`.
    pub fn ensure(&self, key: &str, ttl_ms: u64) -> CacheEntry {
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(entry) = entries.get(key) {
                if entry.ttl_ms == ttl_ms {
                    return entry.clone();
                }
            }
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.entry(key.to_string()).or_insert_with(|| {
            debug!("Creating cache entry for '{}'", key);
            CacheEntry::empty(key, ttl_ms)
        });
        entry.ttl_ms = ttl_ms;
        entry.clone()
    }

    // == Set ==
    /// Replaces the entry for `key` and notifies its subscribers.
    pub fn set(&self, key: &str, entry: CacheEntry) {
        {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            entries.insert(key.to_string(), entry.clone());
        }
        self.notify(key, &entry);
    }

    // == Update ==
    /// Read-modify-write of one entry under the table lock.
    ///
    /// No other write can interleave between reading and storing the entry.
    /// Subscribers are notified once with the result.
    pub fn update<R>(&self, key: &str, f: impl FnOnce(&mut CacheEntry) -> R) -> R {
        self.modify(key, None, f)
    }

    /// Like [`update`](Self::update), but the row carries `ttl_ms` whether
    /// it already existed or is recreated here, e.g. after a reset.
    pub fn update_with_ttl<R>(
        &self,
        key: &str,
        ttl_ms: u64,
        f: impl FnOnce(&mut CacheEntry) -> R,
    ) -> R {
        self.modify(key, Some(ttl_ms), f)
    }

    fn modify<R>(&self, key: &str, ttl_ms: Option<u64>, f: impl FnOnce(&mut CacheEntry) -> R) -> R {
        let (result, snapshot) = {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            let row_ttl_ms = ttl_ms.unwrap_or(self.default_ttl_ms);
            let entry = entries
                .entry(key.to_string())
                .or_insert_with(|| CacheEntry::empty(key, row_ttl_ms));
            if let Some(ttl_ms) = ttl_ms {
                entry.ttl_ms = ttl_ms;
            }
            let result = f(entry);
            (result, entry.clone())
        };
        self.notify(key, &snapshot);
        result
    }

    // == Subscribe ==
    /// Registers `callback` for writes to `key`.
    ///
    /// The callback stays registered until the returned [`Subscription`] is
    /// dropped or passed to [`Subscription::unsubscribe`].
    pub fn subscribe<F>(self: &Arc<Self>, key: &str, callback: F) -> Subscription
    where
        F: Fn(&CacheEntry) + Send + Sync + 'static,
    {
        let id = self.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        subscribers.entry(key.to_string()).or_default().push(Subscriber {
            id,
            callback: Arc::new(callback),
        });

        Subscription {
            store: Arc::downgrade(self),
            key: key.to_string(),
            id,
        }
    }

    /// Number of live subscriptions on `key`.
    pub fn subscriber_count(&self, key: &str) -> usize {
        let subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        subscribers.get(key).map_or(0, Vec::len)
    }

    fn remove_subscriber(&self, key: &str, id: u64) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(list) = subscribers.get_mut(key) {
            list.retain(|s| s.id != id);
            if list.is_empty() {
                subscribers.remove(key);
            }
        }
    }

    fn notify(&self, key: &str, entry: &CacheEntry) {
        let callbacks: Vec<Callback> = {
            let subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
            subscribers
                .get(key)
                .map(|list| list.iter().map(|s| Arc::clone(&s.callback)).collect())
                .unwrap_or_default()
        };

        for callback in callbacks {
            callback(entry);
        }
    }

    // == Reset ==
    /// Drops every entry, e.g. on logout.
    ///
    /// Subscribers of each cleared key are notified with an empty entry.
    /// Subscriptions themselves survive the reset.
    pub fn reset(&self) {
        let cleared: Vec<CacheEntry> = {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            entries
                .drain()
                .map(|(key, entry)| CacheEntry::empty(key, entry.ttl_ms))
                .collect()
        };

        info!("Cache store reset: cleared {} entries", cleared.len());

        for entry in &cleared {
            self.notify(&entry.key, entry);
        }
    }

    // == Length ==
    /// Returns the number of resource rows in the store.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns true if no resource has been accessed yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// == Subscription ==
/// Handle for a registered store callback. Dropping it unsubscribes.
pub struct Subscription {
    store: Weak<CacheStore>,
    key: String,
    id: u64,
}

impl Subscription {
    /// Deregisters the callback now.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(store) = self.store.upgrade() {
            store.remove_subscriber(&self.key, self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("id", &self.id)
            .finish()
    }
}
