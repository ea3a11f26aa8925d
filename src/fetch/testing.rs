//! Scripted transport for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Semaphore;

use crate::error::{FetchError, Result};
use crate::fetch::AuthenticatedRequest;
use crate::models::{HttpResponse, RequestOptions};

/// Transport that replays queued responses and counts requests.
///
/// When gated, every request waits for a permit released with
/// [`MockTransport::release`], so tests decide when fetches settle.
pub struct MockTransport {
    calls: AtomicUsize,
    paths: Mutex<Vec<String>>,
    responses: Mutex<VecDeque<Result<HttpResponse>>>,
    gate: Option<Semaphore>,
}

impl MockTransport {
    /// Answers immediately.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::build(None))
    }

    /// Holds every request until released.
    pub fn gated() -> Arc<Self> {
        Arc::new(Self::build(Some(Semaphore::new(0))))
    }

    fn build(gate: Option<Semaphore>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            paths: Mutex::new(Vec::new()),
            responses: Mutex::new(VecDeque::new()),
            gate,
        }
    }

    /// Queues a 200 response with `body` as JSON.
    pub fn push_json(&self, body: Value) {
        self.push(Ok(HttpResponse::new(200, body.to_string())));
    }

    pub fn push(&self, response: Result<HttpResponse>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn push_network_error(&self) {
        self.push(Err(FetchError::Network("connection refused".to_string())));
    }

    /// Lets `n` held requests proceed.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuthenticatedRequest for MockTransport {
    async fn request(&self, path: &str, _options: RequestOptions) -> Result<HttpResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.paths.lock().unwrap().push(path.to_string());

        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }

        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(HttpResponse::new(200, "[]")))
    }
}
