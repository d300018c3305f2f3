//! vLLM Core Library
//!
//! Adapter between a provider-neutral message/tool model and OpenAI-style
//! `/chat/completions` endpoints served by vLLM or Ollama-compatible
//! backends.
//!
//! - [`protocol`]: neutral messages, tools and models
//! - [`client`]: wire types and the streaming chat client
//! - [`providers`]: translation and the [`providers::LlmProvider`] implementation
//! - [`config`]: file-based provider configuration

pub mod client;
pub mod config;
pub mod protocol;
pub mod providers;

pub use client::{RequestOptions, VllmClient};
pub use providers::{LlmProvider, VllmProvider};

/// Returns the version of the vLLM Core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
