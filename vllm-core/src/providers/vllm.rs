//! vLLM / Ollama provider implementation
//!
//! Composes the converter and the chat-completions client behind
//! [`LlmProvider`].

use super::adapter::{Capabilities, GenerationSink, GenerationStream, LlmProvider};
use super::converter::{aggregate_tool_calls, from_wire_delta, to_wire_messages, to_wire_tools};
use super::error::{ProviderError, ProviderResult};
use crate::client::{ChatRequest, ChatResponse, ClientError, RequestOptions, VllmClient};
use crate::config::{ConfigError, ProviderConfig};
use crate::protocol::{GenerateOptions, Message, MessageRole, Model};
use async_trait::async_trait;
use std::sync::{PoisonError, RwLock};
use tracing::{debug, info, warn};

/// Provider for vLLM and Ollama-compatible chat-completions backends
#[derive(Debug)]
pub struct VllmProvider {
    client: VllmClient,

    /// Model used when a call doesn't name one
    model: RwLock<Option<Model>>,
}

impl VllmProvider {
    /// Create a provider around an existing client
    pub fn new(client: VllmClient) -> Self {
        info!("Creating new provider for {}", client.base_url());
        Self {
            client,
            model: RwLock::new(None),
        }
    }

    /// Create a provider from configuration, selecting `default_model` if set
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let provider = Self::new(VllmClient::from_config(config)?);

        if let Some(model) = &config.default_model {
            provider.set_model(Model::new(model.as_str()));
        }
        Ok(provider)
    }

    pub fn client(&self) -> &VllmClient {
        &self.client
    }

    /// Currently selected model, if any
    pub fn current_model(&self) -> Option<Model> {
        self.model
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_model(&self, model: Model) {
        *self.model.write().unwrap_or_else(PoisonError::into_inner) = Some(model);
    }

    /// An explicit model wins over the current selection
    fn resolve_model(&self, explicit: Option<Model>) -> ProviderResult<Model> {
        explicit
            .or_else(|| self.current_model())
            .ok_or(ProviderError::NoModelSelected)
    }
}

fn build_request(model: &Model, options: &GenerateOptions, stream: bool) -> ChatRequest {
    debug!(
        "Converting {} message(s) and {} tool(s) to wire format",
        options.messages.len(),
        options.tools.len()
    );
    ChatRequest::new(model.id.clone(), to_wire_messages(&options.messages))
        .with_tools(to_wire_tools(&options.tools))
        .with_stream(stream)
}

/// Translate the first choice of a frame and hand it to the sink.
/// Frames without a choice or message (usage-only chunks) are skipped.
fn forward_frame(sink: &GenerationSink, frame: &ChatResponse) -> ProviderResult<()> {
    let Some(delta) = frame.choices.first().and_then(|choice| choice.content_message()) else {
        return Ok(());
    };
    sink.push(from_wire_delta(delta)?)
}

/// Errors raised by our own frame handler come back boxed; unwrap them
fn unwrap_handler_error(err: ClientError) -> ProviderError {
    match err {
        ClientError::Handler(source) => match source.downcast::<ProviderError>() {
            Ok(inner) => *inner,
            Err(source) => ProviderError::Client(ClientError::Handler(source)),
        },
        other => ProviderError::Client(other),
    }
}

#[async_trait]
impl LlmProvider for VllmProvider {
    fn name(&self) -> &str {
        "vllm"
    }

    fn use_model(&self, model: Model) -> ProviderResult<()> {
        if model.id.trim().is_empty() {
            return Err(ProviderError::InvalidModel(
                "model id must not be empty".to_string(),
            ));
        }
        info!("Setting model {}", model.id);
        self.set_model(model);
        Ok(())
    }

    async fn generate(
        &self,
        options: GenerateOptions,
        request: &RequestOptions,
    ) -> ProviderResult<Message> {
        let model = self.resolve_model(options.model.clone())?;
        info!(
            "Generate request received (model: {}) [request_id: {}]",
            model.id, request.request_id
        );

        let response = self
            .client
            .chat(build_request(&model, &options, false), request)
            .await?
            .ok_or(ProviderError::EmptyResponse)?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or(ProviderError::NoChoices)?;
        let index = choice.index;
        let message = choice
            .message
            .or(choice.delta)
            .ok_or(ProviderError::MissingMessage { index })?;

        Ok(Message {
            role: MessageRole::Assistant,
            tool_calls: aggregate_tool_calls(message.tool_calls.as_deref().unwrap_or_default()),
            content: message.content,
            images: Vec::new(),
        })
    }

    /// Must be called from within a Tokio runtime.
    fn generate_stream(
        &self,
        options: GenerateOptions,
        request: &RequestOptions,
    ) -> GenerationStream {
        let model = match self.resolve_model(options.model.clone()) {
            Ok(model) => model,
            Err(err) => {
                warn!("Stream generation rejected: {}", err);
                return GenerationStream::failed(err);
            }
        };
        info!(
            "Stream generation request received (model: {}) [request_id: {}]",
            model.id, request.request_id
        );

        let chat_request = build_request(&model, &options, true);
        let client = self.client.clone();
        let request = request.clone();
        let (sink, stream) = GenerationStream::channel();

        tokio::spawn(async move {
            let result = client
                .chat_stream(chat_request, &request, |frame: &ChatResponse| {
                    forward_frame(&sink, frame)
                })
                .await;

            match result {
                Ok(_) => debug!(
                    "Stream generation finished [request_id: {}]",
                    request.request_id
                ),
                Err(err) => sink.fail(unwrap_handler_error(err)),
            }
        });

        stream
    }

    async fn get_capabilities(&self, request: &RequestOptions) -> ProviderResult<Capabilities> {
        debug!(
            "Capability discovery not supported, reporting unknown [request_id: {}]",
            request.request_id
        );
        Ok(Capabilities::default())
    }
}
