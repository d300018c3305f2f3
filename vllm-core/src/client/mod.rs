//! HTTP client for chat-completions backends
//!
//! This module implements the wire side of the adapter:
//! - Wire types mirroring the backend JSON protocol
//! - Incremental decoding of response frames
//! - The request/response exchange with per-frame callbacks
//! - Cancellation and timeouts per call

pub mod client;
pub mod decoder;
pub mod error;
pub mod types;

pub use client::{VllmClient, DEFAULT_BASE_URL};
pub use error::{BoxError, ClientError, ClientResult};
pub use types::{
    ChatRequest, ChatResponse, Choice, WireMessage, WireTool, WireToolCall, WireToolCallFunction,
    WireToolFunction,
};

use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Per-call options for one exchange
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Unique request ID for log correlation
    pub request_id: Uuid,

    /// Optional timeout covering the whole exchange, body included
    pub timeout: Option<Duration>,

    /// Cancelling this token aborts the exchange with `ClientError::Cancelled`
    pub cancellation: CancellationToken,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            timeout: None,
            cancellation: CancellationToken::new(),
        }
    }
}

impl RequestOptions {
    /// Create new request options with a generated request ID
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timeout for this request
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Tie the exchange to an existing cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }
}
