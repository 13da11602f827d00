//! Conversation driver: one user turn plus the tool round-trips it triggers

mod chat;
mod context;
mod transcript;

pub use chat::{ChatSession, SessionOptions, ToolCallLog, ToolOutcome, TurnOutcome};
pub use context::ConversationContext;
pub use transcript::{NoopObserver, Transcript, TurnObserver};
