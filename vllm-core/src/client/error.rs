//! Client error types

use thiserror::Error;

/// Error type returned by frame handlers
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur during one chat-completions exchange
#[derive(Debug, Error)]
pub enum ClientError {
    /// Request body could not be serialized
    #[error("failed to marshal request: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Request construction, connection or body read failure
    #[error("failed to send request: {0}")]
    Transport(#[source] reqwest::Error),

    /// The per-call timeout elapsed
    #[error("request timed out")]
    Timeout,

    /// The caller cancelled the exchange
    #[error("request cancelled")]
    Cancelled,

    /// Backend answered with a status other than 200
    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    /// A frame could not be decoded
    #[error("failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),

    /// The backend sent an error frame inside a 200 response
    #[error("backend reported an error: {message}")]
    Backend { message: String },

    /// A single frame grew past the decoder's size limit
    #[error("response frame exceeds {limit} bytes")]
    FrameTooLarge { limit: usize },

    /// The SSE framing itself was broken
    #[error("failed to read event stream: {0}")]
    EventStream(String),

    /// The caller's frame handler failed
    #[error("stream handler failed: {0}")]
    Handler(#[source] BoxError),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else {
            ClientError::Transport(err)
        }
    }
}

impl ClientError {
    /// Request construction or network failure
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ClientError::Serialize(_)
                | ClientError::Transport(_)
                | ClientError::Timeout
                | ClientError::Cancelled
        )
    }

    /// Non-200 status or an undecodable frame
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            ClientError::Status { .. }
                | ClientError::Decode(_)
                | ClientError::Backend { .. }
                | ClientError::FrameTooLarge { .. }
                | ClientError::EventStream(_)
        )
    }

    /// HTTP status of a rejected request
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
