//! Chat-completions client implementation using reqwest

use super::decoder::FrameReader;
use super::error::{BoxError, ClientError, ClientResult};
use super::types::{ChatRequest, ChatResponse};
use super::RequestOptions;
use crate::config::{ConfigError, ProviderConfig};
use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, ClientBuilder, StatusCode};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Base URL used when none is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/v1";

/// Path of the chat-completions endpoint, relative to the base URL
const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

/// Default user agent
const USER_AGENT: &str = concat!("vllm-core/", env!("CARGO_PKG_VERSION"));

/// Callback invoked once per decoded frame
type FrameHandler<'a> = dyn FnMut(&ChatResponse) -> Result<(), BoxError> + Send + 'a;

/// Client for a vLLM or Ollama-compatible chat-completions endpoint.
///
/// Holds only the base URL and the HTTP transport, so one instance can serve
/// any number of concurrent exchanges.
#[derive(Debug, Clone)]
pub struct VllmClient {
    base_url: String,
    http: Client,
}

impl VllmClient {
    /// Create a client for [`DEFAULT_BASE_URL`] with a default transport
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            http: Client::new(),
        }
    }

    /// Create a client from provider configuration
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ConfigError> {
        let endpoint = config.endpoint()?;

        let mut builder = ClientBuilder::new()
            .user_agent(config.user_agent.as_deref().unwrap_or(USER_AGENT))
            .gzip(true);
        if let Some(secs) = config.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let http = builder.build().map_err(|e| ConfigError::Invalid {
            message: format!("failed to create HTTP client: {}", e),
        })?;

        Ok(Self::new()
            .with_base_url(endpoint.as_str())
            .with_http_client(http))
    }

    /// Set the base URL; trailing slashes are dropped
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Use a preconfigured HTTP transport
    pub fn with_http_client(mut self, http: Client) -> Self {
        self.http = http;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn chat_url(&self) -> String {
        format!("{}{}", self.base_url, CHAT_COMPLETIONS_PATH)
    }

    /// Send a chat request and return the last frame of the response.
    ///
    /// This is [`chat_stream`](Self::chat_stream) without a handler. `None`
    /// means the backend answered 200 with an empty body.
    pub async fn chat(
        &self,
        request: ChatRequest,
        options: &RequestOptions,
    ) -> ClientResult<Option<ChatResponse>> {
        self.run(request, options, None).await
    }

    /// Send a chat request and call `handler` with every decoded frame.
    ///
    /// The handler runs before the next frame is read. If it fails, the
    /// exchange stops and its error comes back as [`ClientError::Handler`].
    /// An error frame from the backend ends the exchange with
    /// [`ClientError::Backend`] and never reaches the handler.
    pub async fn chat_stream<F, E>(
        &self,
        request: ChatRequest,
        options: &RequestOptions,
        mut handler: F,
    ) -> ClientResult<Option<ChatResponse>>
    where
        F: FnMut(&ChatResponse) -> Result<(), E> + Send,
        E: Into<BoxError>,
    {
        let mut forward = |frame: &ChatResponse| -> Result<(), BoxError> {
            handler(frame).map_err(Into::into)
        };
        let forward: &mut FrameHandler<'_> = &mut forward;
        self.run(request, options, Some(forward)).await
    }

    async fn run(
        &self,
        request: ChatRequest,
        options: &RequestOptions,
        handler: Option<&mut FrameHandler<'_>>,
    ) -> ClientResult<Option<ChatResponse>> {
        tokio::select! {
            biased;
            _ = options.cancellation.cancelled() => {
                warn!("Exchange cancelled [request_id: {}]", options.request_id);
                Err(ClientError::Cancelled)
            }
            result = self.exchange(request, options, handler) => result,
        }
    }

    async fn exchange(
        &self,
        mut request: ChatRequest,
        options: &RequestOptions,
        mut handler: Option<&mut FrameHandler<'_>>,
    ) -> ClientResult<Option<ChatResponse>> {
        let mut exchange = Exchange::new(options.request_id);

        let stream = *request.stream.get_or_insert(false);
        let body = serde_json::to_vec(&request)
            .map_err(|e| exchange.fail(ClientError::Serialize(e)))?;

        let url = self.chat_url();
        info!(
            "Sending chat request to {} (model: {}, stream: {}) [request_id: {}]",
            url, request.model, stream, exchange.request_id
        );

        let mut builder = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| exchange.fail(ClientError::from(e)))?;
        exchange.transition(ExchangeState::RequestSent);

        let status = response.status();
        if status != StatusCode::OK {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => format!("<failed to read body: {}>", e),
            };
            return Err(exchange.fail(ClientError::Status {
                status: status.as_u16(),
                body,
            }));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let mut frames =
            FrameReader::for_content_type(content_type.as_deref(), response.bytes_stream().boxed());
        exchange.transition(ExchangeState::Streaming);

        let mut last = None;
        while let Some(frame) = frames
            .next_frame::<ChatResponse>()
            .await
            .map_err(|e| exchange.fail(e))?
        {
            exchange.frames += 1;

            if let Some(message) = frame.backend_error() {
                return Err(exchange.fail(ClientError::Backend { message }));
            }

            if let Some(handler) = handler.as_deref_mut() {
                handler(&frame).map_err(|e| exchange.fail(ClientError::Handler(e)))?;
            }

            let done = frame.is_done();
            last = Some(frame);
            if done {
                debug!(
                    "Frame {} carried done flag [request_id: {}]",
                    exchange.frames, exchange.request_id
                );
                break;
            }
        }

        exchange.transition(ExchangeState::Done);
        info!(
            "Chat request completed with {} frame(s) [request_id: {}]",
            exchange.frames, exchange.request_id
        );

        Ok(last)
    }
}

impl Default for VllmClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifecycle of one request/response pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExchangeState {
    Idle,
    RequestSent,
    Streaming,
    Done,
}

/// Bookkeeping for one exchange, used for logging
struct Exchange {
    request_id: Uuid,
    state: ExchangeState,
    frames: usize,
}

impl Exchange {
    fn new(request_id: Uuid) -> Self {
        Self {
            request_id,
            state: ExchangeState::Idle,
            frames: 0,
        }
    }

    fn transition(&mut self, next: ExchangeState) {
        debug!(
            "Exchange {:?} -> {:?} [request_id: {}]",
            self.state, next, self.request_id
        );
        self.state = next;
    }

    fn fail(&self, err: ClientError) -> ClientError {
        if err.is_protocol() {
            warn!(
                "Exchange failed while {:?} after {} frame(s) [request_id: {}]: {}",
                self.state, self.frames, self.request_id, err
            );
        } else {
            error!(
                "Exchange failed while {:?} after {} frame(s) [request_id: {}]: {}",
                self.state, self.frames, self.request_id, err
            );
        }
        err
    }
}
