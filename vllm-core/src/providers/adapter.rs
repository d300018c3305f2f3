//! Provider trait and capabilities
//!
//! Defines the interface a host system uses to drive a language-model
//! provider without knowing which backend sits behind it.

use super::error::{ProviderError, ProviderResult};
use crate::client::RequestOptions;
use crate::protocol::{GenerateOptions, Message, Model};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Core provider trait that all LLM providers must implement
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider's name
    fn name(&self) -> &str;

    /// Select the model used by calls that don't name one
    fn use_model(&self, model: Model) -> ProviderResult<()>;

    /// Generate one complete assistant message
    async fn generate(
        &self,
        options: GenerateOptions,
        request: &RequestOptions,
    ) -> ProviderResult<Message>;

    /// Generate a message incrementally.
    ///
    /// Work happens on a spawned task; the returned channels carry its output.
    fn generate_stream(&self, options: GenerateOptions, request: &RequestOptions)
        -> GenerationStream;

    /// Describe what the backend supports
    async fn get_capabilities(&self, request: &RequestOptions) -> ProviderResult<Capabilities>;
}

/// Backend capabilities. `None` means unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Does the backend accept tool definitions?
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supports_tools: Option<bool>,

    /// Does the backend accept images?
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supports_images: Option<bool>,

    /// Does the backend stream responses?
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supports_streaming: Option<bool>,

    /// Maximum context window size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_context_tokens: Option<usize>,
}

impl Capabilities {
    /// True when nothing is known about the backend
    pub fn is_unknown(&self) -> bool {
        *self == Self::default()
    }
}

/// Output channels of a streaming generation.
///
/// `messages` gets one translated delta per frame and `tokens` the text of
/// each delta that has any. `errors` gets at most one terminal error, sent
/// before the three channels close together. A clean end closes all three
/// without an error.
#[derive(Debug)]
pub struct GenerationStream {
    pub messages: mpsc::UnboundedReceiver<Message>,
    pub tokens: mpsc::UnboundedReceiver<String>,
    pub errors: mpsc::Receiver<ProviderError>,
}

/// Producer side of a [`GenerationStream`]
#[derive(Debug)]
pub(crate) struct GenerationSink {
    messages: mpsc::UnboundedSender<Message>,
    tokens: mpsc::UnboundedSender<String>,
    errors: mpsc::Sender<ProviderError>,
}

impl GenerationStream {
    pub(crate) fn channel() -> (GenerationSink, GenerationStream) {
        let (messages_tx, messages) = mpsc::unbounded_channel();
        let (tokens_tx, tokens) = mpsc::unbounded_channel();
        let (errors_tx, errors) = mpsc::channel(1);

        let sink = GenerationSink {
            messages: messages_tx,
            tokens: tokens_tx,
            errors: errors_tx,
        };
        let stream = GenerationStream {
            messages,
            tokens,
            errors,
        };
        (sink, stream)
    }

    /// Stream that fails immediately with `err`
    pub(crate) fn failed(err: ProviderError) -> Self {
        let (sink, stream) = Self::channel();
        sink.fail(err);
        stream
    }

    /// Drain the token channel into one string, then report the terminal error if any
    pub async fn collect_text(mut self) -> ProviderResult<String> {
        let mut text = String::new();
        while let Some(token) = self.tokens.recv().await {
            text.push_str(&token);
        }
        match self.errors.recv().await {
            Some(err) => Err(err),
            None => Ok(text),
        }
    }
}

impl GenerationSink {
    /// Push one delta. Fails once both message and token receivers are gone.
    pub(crate) fn push(&self, delta: Message) -> ProviderResult<()> {
        if self.messages.is_closed() && self.tokens.is_closed() {
            return Err(ProviderError::StreamClosed);
        }

        // a consumer may listen on only one of the two channels
        if !delta.content.is_empty() {
            let _ = self.tokens.send(delta.content.clone());
        }
        let _ = self.messages.send(delta);
        Ok(())
    }

    /// Report a terminal error, closing every channel
    pub(crate) fn fail(self, err: ProviderError) {
        // capacity 1 and this is the only send, so try_send only fails without a receiver
        let _ = self.errors.try_send(err);
    }
}
