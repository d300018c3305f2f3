//! Provider-neutral message, tool and model types
//!
//! These are the types the host system works with. They know nothing about
//! any backend's wire format; translation to and from the chat-completions
//! schema lives in [`crate::providers::converter`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::providers::error::TranslateError;

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instructions that guide the model's behavior
    System,
    /// User input message
    User,
    /// Assistant (model) response
    Assistant,
    /// Result of a tool invocation
    Tool,
}

impl MessageRole {
    /// All roles, in declaration order
    pub const ALL: [MessageRole; 4] = [
        MessageRole::System,
        MessageRole::User,
        MessageRole::Assistant,
        MessageRole::Tool,
    ];

    /// Lowercase name of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Tool => "tool",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageRole {
    type Err = TranslateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MessageRole::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| TranslateError::UnknownRole {
                role: s.to_string(),
            })
    }
}

/// A base64-encoded image attached to a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub base64: String,
}

impl Image {
    pub fn new(base64: impl Into<String>) -> Self {
        Self {
            base64: base64.into(),
        }
    }
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Identifier assigned by the backend (may be empty for Ollama)
    #[serde(default)]
    pub id: String,

    /// Name of the function to call
    pub name: String,

    /// Raw JSON argument text, exactly as the backend produced it
    pub arguments: String,
}

impl ToolCall {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    /// Parse the argument payload.
    ///
    /// Arguments are carried as opaque text all the way from the wire, so a
    /// model that emits malformed JSON only fails here.
    pub fn parse_arguments<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.arguments)
    }
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: MessageRole,

    /// Text content of the message
    #[serde(default)]
    pub content: String,

    /// Attached images
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<Image>,

    /// Tool calls (assistant messages with tool use)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

impl Message {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        MessageBuilder::new(MessageRole::System, content).build()
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        MessageBuilder::new(MessageRole::User, content).build()
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        MessageBuilder::new(MessageRole::Assistant, content).build()
    }

    /// Create a tool result message
    pub fn tool(content: impl Into<String>) -> Self {
        MessageBuilder::new(MessageRole::Tool, content).build()
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Builder for messages with images or tool calls
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    role: MessageRole,
    content: String,
    images: Vec<Image>,
    tool_calls: Vec<ToolCall>,
}

impl MessageBuilder {
    /// Create a new message builder with role and text content
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            images: Vec::new(),
            tool_calls: Vec::new(),
        }
    }

    /// Attach a base64-encoded image
    pub fn with_image(mut self, base64: impl Into<String>) -> Self {
        self.images.push(Image::new(base64));
        self
    }

    /// Add a tool call
    pub fn with_tool_call(mut self, call: ToolCall) -> Self {
        self.tool_calls.push(call);
        self
    }

    pub fn build(self) -> Message {
        Message {
            role: self.role,
            content: self.content,
            images: self.images,
            tool_calls: self.tool_calls,
        }
    }
}

/// A function tool exposed to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// JSON schema of the function parameters, passed through untouched
    #[serde(default)]
    pub parameters: serde_json::Value,
}

impl Tool {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// A model served by the backend
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Model {
    pub id: String,
}

impl Model {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl From<&str> for Model {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for Model {
    fn from(id: String) -> Self {
        Self { id }
    }
}

/// Input of a generation call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateOptions {
    /// Conversation so far
    pub messages: Vec<Message>,

    /// Tools the model may call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,

    /// Model for this call only; falls back to the provider's current model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<Model>,
}

impl GenerateOptions {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn with_tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_model(mut self, model: impl Into<Model>) -> Self {
        self.model = Some(model.into());
        self
    }
}
