//! ollama-agent: terminal chat client for a local Ollama server
//!
//! This library provides:
//! - A non-streaming client for Ollama's `/api/chat` endpoint
//! - A registry of local tools the model can call
//! - A chat session that dispatches tool calls and feeds results back

pub mod agent;
pub mod config;
pub mod llm;
pub mod tools;

pub use agent::{ChatSession, SessionOptions};
pub use config::Config;
pub use llm::{ChatClient, OllamaClient};
pub use tools::ToolRegistry;
