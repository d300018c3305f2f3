//! Protocol module for the provider-neutral data model
//!
//! This module defines the message, tool and model types the host system
//! exchanges with a provider. They are independent of any backend wire
//! format.

pub mod types;

pub use types::{
    GenerateOptions, Image, Message, MessageBuilder, MessageRole, Model, Tool, ToolCall,
};
