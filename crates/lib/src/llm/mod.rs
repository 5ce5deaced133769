//! Completion backend abstraction and the OpenAI-compatible client.
//!
//! The core only needs one call: given the ordered history, return one reply.

mod openai;

pub use openai::OpenAiClient;

use crate::conversation::Message;
use crate::error::Result;
use async_trait::async_trait;

/// Stateless request/response completion service.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Complete the conversation: `messages` is the full ordered history, instruction first.
    async fn complete(&self, messages: &[Message]) -> Result<Message>;
}
