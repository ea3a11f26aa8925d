//! Cache Registry
//!
//! Owns the shared store and fetch coordinator for a session and hands out
//! resource cache handles. The process-wide instance is created on first
//! access to [`CacheRegistry::global`] (or set with [`CacheRegistry::install`])
//! and its cached state is dropped with [`CacheRegistry::reset`] on logout.

use std::sync::{Arc, OnceLock};

use tracing::info;

use crate::cache::{CacheStore, Clock, SystemClock};
use crate::config::Config;
use crate::error::Result;
use crate::fetch::{AuthenticatedRequest, FetchCoordinator, ReqwestTransport};
use crate::resource::cache::CacheContext;
use crate::resource::{ResourceCache, ResourceConfig};

static GLOBAL: OnceLock<CacheRegistry> = OnceLock::new();

// == Cache Registry ==
/// Shared cache service. Cloning yields another handle on the same state.
#[derive(Clone)]
pub struct CacheRegistry {
    context: Arc<CacheContext>,
    ttl_ms: u64,
}

impl CacheRegistry {
    // == Constructor ==
    /// Creates a registry over `transport` using wall-clock time.
    pub fn new(transport: Arc<dyn AuthenticatedRequest>, config: &Config) -> Self {
        Self::with_clock(transport, config, Arc::new(SystemClock))
    }

    /// Creates a registry with an explicit clock.
    pub fn with_clock(
        transport: Arc<dyn AuthenticatedRequest>,
        config: &Config,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let context = CacheContext {
            store: Arc::new(CacheStore::new(config.cache_ttl_ms)),
            coordinator: FetchCoordinator::new(transport),
            clock,
        };

        Self {
            context: Arc::new(context),
            ttl_ms: config.cache_ttl_ms,
        }
    }

    /// Creates a registry backed by the HTTP transport.
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = ReqwestTransport::from_config(config)?;
        Ok(Self::new(Arc::new(transport), config))
    }

    // == Global Instance ==
    /// The process-wide registry, built from the environment on first use.
    pub fn global() -> Result<&'static CacheRegistry> {
        if let Some(registry) = GLOBAL.get() {
            return Ok(registry);
        }

        let registry = Self::from_config(&Config::from_env())?;
        info!("Initialized global cache registry");
        Ok(GLOBAL.get_or_init(|| registry))
    }

    /// Sets the process-wide registry. Fails, returning `registry`, if one
    /// was already initialized.
    pub fn install(registry: CacheRegistry) -> std::result::Result<(), CacheRegistry> {
        GLOBAL.set(registry)
    }

    // == Resources ==
    /// Handle on an arbitrary resource.
    pub fn resource(&self, config: ResourceConfig) -> ResourceCache {
        ResourceCache::new(Arc::clone(&self.context), config)
    }

    pub fn clientes(&self) -> ResourceCache {
        self.resource(ResourceConfig::clientes().with_ttl_ms(self.ttl_ms))
    }

    pub fn productos(&self) -> ResourceCache {
        self.resource(ResourceConfig::productos().with_ttl_ms(self.ttl_ms))
    }

    pub fn usuarios(&self) -> ResourceCache {
        self.resource(ResourceConfig::usuarios().with_ttl_ms(self.ttl_ms))
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.context.store
    }

    // == Reset ==
    /// Drops all cached collections, e.g. on logout.
    ///
    /// Subscribers are told their resource is empty again. Fetches already
    /// in flight are not cancelled and will repopulate their entry.
    pub fn reset(&self) {
        info!("Resetting resource caches");
        self.context.store.reset();
    }
}
