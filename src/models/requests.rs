//! Request options passed to the authenticated transport.

use reqwest::Method;
use serde_json::Value;

/// Options for one backend request.
///
/// Defaults to a body-less `GET`, which is all the cache itself issues.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// HTTP method
    pub method: Method,
    /// Optional JSON body
    pub body: Option<Value>,
}

impl RequestOptions {
    /// A plain `GET`.
    pub fn get() -> Self {
        Self::default()
    }

    /// A request with `method` and a JSON body.
    pub fn with_body(method: Method, body: Value) -> Self {
        Self {
            method,
            body: Some(body),
        }
    }
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            body: None,
        }
    }
}
