//! Chat backend integration with a uniform streaming interface
//!
//! This crate implements:
//! - Shared conversation types (turns and content parts)
//! - Decoding of NDJSON and SSE response streams, robust to chunk boundaries
//! - Transcript accumulation with per-backend append/replace semantics
//! - Ollama-style (`/api/chat`) and OpenAI-style (`/chat/completions`) clients
//!   behind the [`ChatBackend`] trait

#[cfg(test)]
mod tests;

mod utils;

pub mod accumulator;
pub mod decoder;
pub mod factory;
pub mod ollama;
pub mod openai;
pub mod streaming;
pub mod types;

pub use accumulator::{AccumulationMode, TranscriptAccumulator};
pub use ollama::OllamaClient;
pub use openai::OpenAIClient;
pub use types::*;

use anyhow::Result;
use async_trait::async_trait;

/// Receives the full transcript text after every fragment
pub type TranscriptCallback<'a> = dyn FnMut(&str) -> Result<()> + Send + 'a;

/// Trait for different chat backend implementations
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Whether fragments from this backend extend or replace the transcript
    fn accumulation_mode(&self) -> AccumulationMode;

    /// Streams a completion for `request`, invoking `on_update` with the full
    /// text so far after every fragment. Returns the final text.
    async fn stream_chat(
        &self,
        request: ChatRequest,
        on_update: &mut TranscriptCallback<'_>,
    ) -> Result<String>;
}
