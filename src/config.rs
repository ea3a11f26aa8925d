//! Configuration Module
//!
//! Handles loading cache and backend settings from environment variables.

use std::env;

// == Public Constants ==
/// Default freshness window for every resource: five minutes.
pub const DEFAULT_TTL_MS: u64 = 5 * 60 * 1000;

/// Backend used when `API_BASE_URL` is not set.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";

/// Transport timeout used when `REQUEST_TIMEOUT_SECS` is not set.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Cache and backend configuration.
///
/// All values can be configured via environment variables with sensible defaults.
/// Cached state lives only for the process; nothing is persisted.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL that resource paths are joined onto
    pub api_base_url: String,
    /// TTL in milliseconds applied to every resource
    pub cache_ttl_ms: u64,
    /// Bearer token attached to backend requests
    pub access_token: Option<String>,
    /// Transport timeout in seconds
    pub request_timeout_secs: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `API_BASE_URL` - Backend base URL (default: http://localhost:8000/api)
    /// - `CACHE_TTL_MS` - Cache TTL in milliseconds (default: 300000)
    /// - `ACCESS_TOKEN` - Bearer token (default: none)
    /// - `REQUEST_TIMEOUT_SECS` - Transport timeout (default: 30)
    pub fn from_env() -> Self {
        Self {
            api_base_url: env::var("API_BASE_URL")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            cache_ttl_ms: env::var("CACHE_TTL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TTL_MS),
            access_token: env::var("ACCESS_TOKEN")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            cache_ttl_ms: DEFAULT_TTL_MS,
            access_token: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}
