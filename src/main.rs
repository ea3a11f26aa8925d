//! Resource Cache - cache warm-up and diagnostics
//!
//! Loads the client, product and user collections through the shared cache
//! and logs what each resource holds.

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use resource_cache::{CacheRegistry, Config, ResourceCache};

/// Entry point for the warm-up tool.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Install the process-wide cache registry
/// 4. Fetch every resource concurrently and log its cache info
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "resource_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!(
        "Configuration loaded: api_base_url={}, cache_ttl_ms={}, authenticated={}",
        config.api_base_url,
        config.cache_ttl_ms,
        config.access_token.is_some()
    );

    let registry = CacheRegistry::from_config(&config).context("failed to build HTTP transport")?;
    if CacheRegistry::install(registry).is_err() {
        warn!("Cache registry was already initialized");
    }
    let registry = CacheRegistry::global().context("cache registry unavailable")?;

    let clientes = registry.clientes();
    let productos = registry.productos();
    let usuarios = registry.usuarios();

    tokio::join!(
        report(&clientes),
        report(&productos),
        report(&usuarios)
    );

    Ok(())
}

/// Loads one resource and logs its diagnostics. Fetch failures are logged,
/// not returned.
async fn report(resource: &ResourceCache) {
    let view = resource.load().await;

    if let Some(message) = view.error_message() {
        warn!("{}: {}", resource.name(), message);
    }

    match serde_json::to_string(&view.cache_info) {
        Ok(info) => info!("{}: {}", resource.name(), info),
        Err(e) => warn!("{}: failed to serialize cache info: {}", resource.name(), e),
    }
}
