//! Chat client for the Ollama API

mod error;
mod ollama;
mod types;

pub use error::LlmError;
pub use ollama::{OllamaClient, DEFAULT_MODEL, DEFAULT_URL};
pub use types::*;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// How failures that do not break the exchange itself are treated
///
/// Lenient keeps the loop going with an empty reply (non-200) or an empty tool
/// result (tool failure) and only logs the detail. Strict surfaces both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMode {
    #[default]
    Lenient,
    Strict,
}

/// One request/response cycle against a chat endpoint
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send an explicit message list
    async fn send_messages(&self, messages: Vec<Message>) -> Result<ChatResponse, LlmError>;

    /// Send a single message with the given role
    ///
    /// The request carries only this message; callers strip trailing
    /// newlines themselves.
    async fn send(&self, input: &str, role: Role) -> Result<ChatResponse, LlmError> {
        self.send_messages(vec![Message::new(role, input)]).await
    }
}
