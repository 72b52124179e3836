//! Text-generation service integration
//!
//! The core consumes the external text-generation service through the
//! narrow [`TextGenerator`] trait; [`LlmClient`] is the production
//! implementation speaking the OpenAI-compatible chat-completions
//! protocol (Ollama, OpenRouter, and friends).

mod client;
mod prompts;
mod types;

use async_trait::async_trait;

use crate::error::Result;

pub use client::LlmClient;
pub use prompts::{
    disambiguation_prompt, triple_extraction_prompt, DISAMBIGUATION_SYSTEM_PROMPT,
    TRIPLE_EXTRACTION_SYSTEM_PROMPT,
};
pub use types::{ChatRequest, ChatResponse, LlmResponse, Message, MessageRole};

/// Narrow contract for the external text-generation service.
///
/// Both triple extraction and entity disambiguation go through this single
/// call shape, so tests can substitute deterministic stubs.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for the given system and user prompts
    async fn generate(&self, system: &str, user: &str) -> Result<String>;
}
