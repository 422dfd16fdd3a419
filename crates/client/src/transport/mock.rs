//! Mock transport for testing.
//!
//! Replays queued responses in order and records every request it saw.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use serde_json::Value;

use super::{ApiRequest, RawResponse, Transport, TransportError};

#[derive(Clone, Debug, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Debug, Default)]
struct MockTransportInner {
    requests: Vec<ApiRequest>,
    responses: VecDeque<Result<RawResponse, String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, MockTransportInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a response with a JSON body.
    pub fn push_json(&self, status: u16, body: Value) {
        self.push_raw(status, body.to_string().into_bytes());
    }

    /// Queue a response with an arbitrary body.
    pub fn push_raw(&self, status: u16, body: impl Into<Vec<u8>>) {
        self.inner().responses.push_back(Ok(RawResponse {
            status,
            body: body.into(),
        }));
    }

    /// Cause the next request to fail before any response arrives.
    pub fn push_connection_failure(&self, error: &str) {
        self.inner().responses.push_back(Err(error.to_string()));
    }

    /// Every request sent so far, oldest first.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.inner().requests.clone()
    }

    pub fn last_request(&self) -> Option<ApiRequest> {
        self.inner().requests.last().cloned()
    }

    pub fn pending_responses(&self) -> usize {
        self.inner().responses.len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: ApiRequest) -> Result<RawResponse, TransportError> {
        let mut inner = self.inner();
        inner.requests.push(request);
        match inner.responses.pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(error)) => Err(TransportError::Connection(error)),
            None => Err(TransportError::Connection("no response queued".to_string())),
        }
    }
}
