//! Conversation history for sessions that resend prior turns

use crate::llm::Message;

/// Ordered message history, oldest first
///
/// Unbounded: every message of the session is resent, so a tool reply is
/// never separated from the assistant message that requested it.
#[derive(Default)]
pub struct ConversationContext {
    messages: Vec<Message>,
}

impl ConversationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Drop the newest message (used when its request failed)
    pub fn pop(&mut self) -> Option<Message> {
        self.messages.pop()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ToolCall;
    use serde_json::json;

    #[test]
    fn keeps_every_message_in_order() {
        let mut ctx = ConversationContext::new();
        for i in 0..150 {
            ctx.push(Message::user(format!("m{}", i)));
        }
        assert_eq!(ctx.messages().len(), 150);
        assert_eq!(ctx.messages()[0].content, "m0");
        assert_eq!(ctx.messages()[149].content, "m149");
    }

    #[test]
    fn tool_reply_stays_paired_with_its_request() {
        let mut ctx = ConversationContext::new();
        let mut request = Message::assistant("");
        request.tool_calls = vec![ToolCall::new("get_current_weather", json!({"location": "Paris"}))];
        ctx.push(Message::user("Weather?"));
        ctx.push(request);
        ctx.push(Message::tool("sunny"));

        let roles: Vec<_> = ctx.messages().iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["user", "assistant", "tool"]);
        assert!(!ctx.messages()[1].tool_calls.is_empty());
    }

    #[test]
    fn pop_removes_newest() {
        let mut ctx = ConversationContext::new();
        ctx.push(Message::user("a"));
        ctx.push(Message::tool("b"));
        assert_eq!(ctx.pop().unwrap().content, "b");
        assert_eq!(ctx.messages(), &[Message::user("a")]);
    }
}
