//! Language-model integration for structured route extraction.
//!
//! Talks to Ollama or any OpenAI-compatible chat completions API. Callers
//! depend on the [`CompletionService`] trait so the transport can be
//! swapped out.

mod client;

pub use client::{
    CompletionRequest, CompletionService, LlmClient, LlmConfig, LlmError, LlmProvider,
    DEFAULT_ROUTE_PROMPT,
};
