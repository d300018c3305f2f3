//! Chat-completions wire types
//!
//! These types match the JSON accepted and produced by vLLM and
//! Ollama-compatible `/chat/completions` endpoints. Optional fields are
//! omitted from the serialized body when unset, never sent as `null`.

use serde::{Deserialize, Deserializer, Serialize};

/// Wire role literal for system messages
pub const ROLE_SYSTEM: &str = "system";
/// Wire role literal for user messages
pub const ROLE_USER: &str = "user";
/// Wire role literal for assistant messages
pub const ROLE_ASSISTANT: &str = "assistant";
/// Wire role literal for tool result messages
pub const ROLE_TOOL: &str = "tool";

/// Tool type constant used by every function tool
pub const TOOL_TYPE_FUNCTION: &str = "function";

/// `object` value of a vLLM error frame
pub const OBJECT_ERROR: &str = "error";

/// Chat completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<WireTool>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<WireMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            tools: None,
            stream: None,
        }
    }

    pub fn with_tools(mut self, tools: Option<Vec<WireTool>>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = Some(stream);
        self
    }
}

/// Message as it appears on the wire
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    /// Mid-stream deltas usually omit the role
    #[serde(default)]
    pub role: String,

    /// vLLM sends `null` content on pure tool-call messages
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,

    /// Ollama-specific base64 image list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
}

/// Tool definition offered to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireTool {
    #[serde(rename = "type")]
    pub tool_type: String,

    pub function: WireToolFunction,
}

/// Function half of a tool definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireToolFunction {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Tool call made by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireToolCall {
    #[serde(default)]
    pub id: String,

    #[serde(rename = "type", default = "default_tool_type")]
    pub tool_type: String,

    pub function: WireToolCallFunction,
}

/// Function being called
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireToolCallFunction {
    #[serde(default)]
    pub name: String,

    /// OpenAI-style backends send a JSON string here, Ollama sends an
    /// object. Both are kept as text, keys in the order sent, and never
    /// validated.
    #[serde(default, deserialize_with = "arguments_as_text")]
    pub arguments: String,
}

/// One decoded response frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub object: String,

    #[serde(default)]
    pub created: i64,

    #[serde(default)]
    pub model: String,

    #[serde(default)]
    pub choices: Vec<Choice>,

    /// Ollama's explicit end-of-stream marker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done: Option<bool>,

    /// Text of an `"object": "error"` frame
    #[serde(
        default,
        rename = "message",
        skip_serializing_if = "Option::is_none"
    )]
    pub error_message: Option<serde_json::Value>,

    /// Error payload of older vLLM servers and Ollama, a string or an object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<serde_json::Value>,
}

impl ChatResponse {
    /// True when the backend flagged this frame as the last one
    pub fn is_done(&self) -> bool {
        self.done.unwrap_or(false)
    }

    /// Error reported by the backend inside a 200 response, if this frame is one
    pub fn backend_error(&self) -> Option<String> {
        if let Some(error) = &self.error {
            return Some(error_text(error));
        }
        if self.object == OBJECT_ERROR {
            return Some(
                self.error_message
                    .as_ref()
                    .map(error_text)
                    .unwrap_or_else(|| "unspecified backend error".to_string()),
            );
        }
        None
    }
}

fn error_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text.clone(),
        serde_json::Value::Object(fields) => match fields.get("message") {
            Some(serde_json::Value::String(text)) => text.clone(),
            _ => value.to_string(),
        },
        other => other.to_string(),
    }
}

/// One choice within a frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<WireMessage>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<WireMessage>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

impl Choice {
    /// Full message if present, otherwise the streamed delta
    pub fn content_message(&self) -> Option<&WireMessage> {
        self.message.as_ref().or(self.delta.as_ref())
    }

    /// Finish reason, empty while generation is still in progress
    pub fn finish_reason(&self) -> &str {
        self.finish_reason.as_deref().unwrap_or_default()
    }
}

fn default_tool_type() -> String {
    TOOL_TYPE_FUNCTION.to_string()
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn arguments_as_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => Ok(String::new()),
        serde_json::Value::String(text) => Ok(text),
        other => Ok(other.to_string()),
    }
}
