//! Error types for the resource cache
//!
//! Every failure of a collection fetch is normalized into [`FetchError`] at the
//! coordinator boundary. Local mutations never fail and have no error type.

use serde_json::Value;
use thiserror::Error;

// == Fetch Error Enum ==
/// Failure of a resource fetch.
///
/// `Clone` because one coalesced outcome is handed to every waiting caller
/// and also kept on the cache entry for display.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Transport or connectivity failure before any response arrived
    #[error("Network error: {0}")]
    Network(String),

    /// The backend answered with a non-success status code
    #[error("{}", http_message(.status, .detail))]
    Http {
        /// HTTP status code
        status: u16,
        /// Server-provided `detail` message, when the body carried one
        detail: Option<String>,
    },

    /// The response body was not JSON, or not a collection of entities
    #[error("Parse error: {0}")]
    Parse(String),
}

impl FetchError {
    // == From Response ==
    /// Builds an HTTP error from a status code and the raw response body.
    ///
    /// The backend reports failures as `{"detail": "..."}`; anything else
    /// leaves `detail` empty.
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let detail = serde_json::from_slice::<Value>(body)
            .ok()
            .and_then(|json| json.get("detail").and_then(Value::as_str).map(String::from));

        FetchError::Http { status, detail }
    }

    /// HTTP status code, if this is an HTTP error.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn http_message(status: &u16, detail: &Option<String>) -> String {
    match detail {
        Some(detail) => format!("HTTP error {}: {}", status, detail),
        None => format!("HTTP error {}", status),
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Parse(err.to_string())
    }
}

// == Result Type Alias ==
/// Convenience Result type for fetch operations.
pub type Result<T> = std::result::Result<T, FetchError>;
