//! Raw backend response as seen by the cache.

use serde::de::DeserializeOwned;

use crate::error::{FetchError, Result};

/// Status and body of a completed backend request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Raw response body
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a new HttpResponse
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// True for 2xx status codes.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parses the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(FetchError::from)
    }

    /// Converts a non-success response into an HTTP error, passing
    /// successful responses through.
    pub fn error_for_status(self) -> Result<Self> {
        if self.ok() {
            Ok(self)
        } else {
            Err(FetchError::from_response(self.status, &self.body))
        }
    }
}
