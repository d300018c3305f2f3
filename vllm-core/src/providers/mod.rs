//! Provider abstraction and the vLLM adapter
//!
//! This module implements the provider layer: the neutral provider trait,
//! translation between the neutral and wire schemas, and the provider that
//! drives a vLLM or Ollama-compatible backend.

pub mod adapter;
pub mod converter;
pub mod error;
pub mod models;
pub mod vllm;

pub use adapter::{Capabilities, GenerationStream, LlmProvider};
pub use error::{ProviderError, ProviderResult, TranslateError};
pub use vllm::VllmProvider;
