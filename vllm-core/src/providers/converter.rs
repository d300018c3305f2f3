//! Conversion between the neutral protocol and the chat-completions wire format
//!
//! Every function here is pure: values are cloned into freshly built
//! structures and no references are kept.

use super::error::TranslateError;
use crate::client::types::{
    WireMessage, WireTool, WireToolCall, WireToolCallFunction, WireToolFunction, ROLE_ASSISTANT,
    ROLE_SYSTEM, ROLE_TOOL, ROLE_USER, TOOL_TYPE_FUNCTION,
};
use crate::protocol::{Image, Message, MessageRole, Tool, ToolCall};

/// Wire literal for a neutral role
pub fn wire_role(role: MessageRole) -> &'static str {
    match role {
        MessageRole::System => ROLE_SYSTEM,
        MessageRole::User => ROLE_USER,
        MessageRole::Assistant => ROLE_ASSISTANT,
        MessageRole::Tool => ROLE_TOOL,
    }
}

/// Neutral role for a wire literal
pub fn parse_role(role: &str) -> Result<MessageRole, TranslateError> {
    match role {
        ROLE_SYSTEM => Ok(MessageRole::System),
        ROLE_USER => Ok(MessageRole::User),
        ROLE_ASSISTANT => Ok(MessageRole::Assistant),
        ROLE_TOOL => Ok(MessageRole::Tool),
        other => Err(TranslateError::UnknownRole {
            role: other.to_string(),
        }),
    }
}

/// Convert a neutral message to wire format
pub fn to_wire_message(message: &Message) -> WireMessage {
    WireMessage {
        role: wire_role(message.role).to_string(),
        content: message.content.clone(),
        tool_calls: non_empty(message.tool_calls.iter().map(to_wire_tool_call).collect()),
        images: non_empty(message.images.iter().map(|i| i.base64.clone()).collect()),
    }
}

/// Convert a conversation to wire format, preserving order
pub fn to_wire_messages(messages: &[Message]) -> Vec<WireMessage> {
    messages.iter().map(to_wire_message).collect()
}

/// Convert a wire message back to neutral form
pub fn from_wire_message(message: &WireMessage) -> Result<Message, TranslateError> {
    let role = parse_role(&message.role)?;
    Ok(build_message(role, message))
}

/// Convert a list of wire messages; one unknown role fails the whole batch
pub fn from_wire_messages(messages: &[WireMessage]) -> Result<Vec<Message>, TranslateError> {
    messages.iter().map(from_wire_message).collect()
}

/// Convert a streamed delta. Deltas after the first usually omit the
/// role, which then means assistant.
pub fn from_wire_delta(delta: &WireMessage) -> Result<Message, TranslateError> {
    let role = if delta.role.is_empty() {
        MessageRole::Assistant
    } else {
        parse_role(&delta.role)?
    };
    Ok(build_message(role, delta))
}

fn build_message(role: MessageRole, message: &WireMessage) -> Message {
    Message {
        role,
        content: message.content.clone(),
        images: message
            .images
            .iter()
            .flatten()
            .map(|base64| Image::new(base64.clone()))
            .collect(),
        tool_calls: aggregate_tool_calls(message.tool_calls.as_deref().unwrap_or_default()),
    }
}

/// Convert a neutral tool definition to wire format
pub fn to_wire_tool(tool: &Tool) -> WireTool {
    WireTool {
        tool_type: TOOL_TYPE_FUNCTION.to_string(),
        function: WireToolFunction {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: tool.parameters.clone(),
        },
    }
}

/// Convert tool definitions; `None` when there are none so the field is omitted
pub fn to_wire_tools(tools: &[Tool]) -> Option<Vec<WireTool>> {
    non_empty(tools.iter().map(to_wire_tool).collect())
}

/// Copy wire tool calls into neutral form. Arguments stay unparsed.
pub fn aggregate_tool_calls(calls: &[WireToolCall]) -> Vec<ToolCall> {
    calls
        .iter()
        .map(|call| ToolCall {
            id: call.id.clone(),
            name: call.function.name.clone(),
            arguments: call.function.arguments.clone(),
        })
        .collect()
}

fn to_wire_tool_call(call: &ToolCall) -> WireToolCall {
    WireToolCall {
        id: call.id.clone(),
        tool_type: TOOL_TYPE_FUNCTION.to_string(),
        function: WireToolCallFunction {
            name: call.name.clone(),
            arguments: call.arguments.clone(),
        },
    }
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}
