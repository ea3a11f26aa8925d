//! Authenticated Transport
//!
//! The cache treats the backend as an opaque authenticated request function.
//! [`ReqwestTransport`] is the production implementation: it resolves paths
//! against the API base URL and attaches the bearer token.

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::debug;

use crate::config::Config;
use crate::error::{FetchError, Result};
use crate::models::{HttpResponse, RequestOptions};

/// Issues requests against the backend on behalf of the cache.
///
/// Implementations own base-URL resolution, credentials and transport
/// errors. Failures before a response arrives are [`FetchError::Network`].
#[async_trait]
pub trait AuthenticatedRequest: Send + Sync {
    async fn request(&self, path: &str, options: RequestOptions) -> Result<HttpResponse>;
}

// == Reqwest Transport ==
/// HTTP transport with bearer-token authentication.
pub struct ReqwestTransport {
    client: Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl ReqwestTransport {
    /// Creates a transport for `base_url` with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: RwLock::new(None),
        })
    }

    /// Creates a transport from configuration, including the initial token.
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = Self::new(
            config.api_base_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )?;
        if let Some(token) = &config.access_token {
            transport.set_token(token.clone());
        }
        Ok(transport)
    }

    /// Sets the bearer token sent with every request (login).
    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token.into());
    }

    /// Stops sending a bearer token (logout).
    pub fn clear_token(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Absolute URL for a resource path.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn token(&self) -> Option<String> {
        self.token.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl AuthenticatedRequest for ReqwestTransport {
    async fn request(&self, path: &str, options: RequestOptions) -> Result<HttpResponse> {
        let url = self.url(path);
        debug!("{} {}", options.method, url);

        let mut builder = self
            .client
            .request(options.method, &url)
            .header(CONTENT_TYPE, "application/json");

        if let Some(token) = self.token() {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &options.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Network(format!("Failed to read response body: {}", e)))?;

        Ok(HttpResponse::new(status, body.to_vec()))
    }
}
