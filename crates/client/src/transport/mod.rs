//! Transport abstraction under the repository boundary.
//!
//! A transport only moves bytes: it sends one request and hands back the
//! status code and raw body. Interpreting them is the repository's job.
//!
//! - [`HttpTransport`] talks HTTPS with a bearer credential.
//! - [`MockTransport`] replays queued responses for tests.

mod http;
mod mock;

pub use http::{HttpTransport, StaticToken, TokenProvider};
pub use mock::MockTransport;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Transport errors. All of them mean no usable response was received.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("request timed out")]
    Timeout,

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base URL, e.g. `groups/7/expenses`.
    pub path: String,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body,
        }
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Patch,
            path: path.into(),
            body: Some(body),
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: Method::Delete,
            path: path.into(),
            body: None,
        }
    }
}

/// Status and body of a response that reached the client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends one request and waits for the complete response.
    async fn execute(&self, request: ApiRequest) -> Result<RawResponse, TransportError>;
}
