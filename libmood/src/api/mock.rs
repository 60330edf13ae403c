//! Scripted transport for tests
//!
//! Replies are served in FIFO order. Every request is recorded so tests can
//! assert on method, URL, headers and body. Clones share the same script and
//! request log.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::sleep;

use super::{ApiRequest, ApiResponse, Transport};
use crate::error::RequestError;

#[derive(Clone, Default)]
pub struct MockTransport {
    replies: Arc<Mutex<VecDeque<Result<ApiResponse, RequestError>>>>,
    requests: Arc<Mutex<Vec<ApiRequest>>>,
    delay: Duration,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a JSON reply
    pub fn reply_json(self, status: u16, body: Value) -> Self {
        self.push(Ok(ApiResponse::json(status, &body)));
        self
    }

    /// Queue a reply with an arbitrary body
    pub fn reply_raw(self, status: u16, body: Vec<u8>) -> Self {
        self.push(Ok(ApiResponse { status, body }));
        self
    }

    /// Queue a transport failure
    pub fn reply_network_error(self, message: &str) -> Self {
        self.push(Err(RequestError::Network(message.to_string())));
        self
    }

    /// Delay every reply (simulates a slow network)
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Queue a reply on an already shared transport
    pub fn push(&self, reply: Result<ApiResponse, RequestError>) {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
    }

    /// Requests sent so far, oldest first
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn last_request(&self) -> Option<ApiRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    /// Replies still queued
    pub fn pending_replies(&self) -> usize {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, RequestError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| Err(RequestError::Network("no scripted reply".to_string())))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
