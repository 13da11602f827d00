//! Chat session with tool dispatch

use super::context::ConversationContext;
use super::transcript::{Transcript, TurnObserver};
use crate::llm::{ChatClient, ChatResponse, ErrorMode, LlmError, Message, ToolCall};
use crate::tools::ToolRegistry;
use anyhow::Result;
use serde_json::Value;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Session behaviour knobs
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub error_mode: ErrorMode,
    /// Resend the whole conversation instead of only the current message
    pub keep_history: bool,
    /// Upper bound on tool-call rounds in one turn; values below 1 count as 1
    pub max_tool_rounds: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            error_mode: ErrorMode::Lenient,
            keep_history: false,
            max_tool_rounds: 5,
        }
    }
}

/// What happened to a single tool call
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    Completed(String),
    Failed(String),
    Unavailable,
}

/// A single tool call log entry
#[derive(Debug, Clone)]
pub struct ToolCallLog {
    pub tool: String,
    pub args: Value,
    pub outcome: ToolOutcome,
}

/// Result of one turn
#[derive(Debug)]
pub struct TurnOutcome {
    /// Last reply received from the server
    pub response: ChatResponse,
    pub tool_calls: Vec<ToolCallLog>,
    /// Follow-up send that cut the tool-call sequence short
    pub aborted: Option<LlmError>,
}

/// Where a turn stands after the latest reply
#[derive(Debug)]
enum TurnState {
    AwaitingInput,
    /// Calls from the latest round that still have to be dispatched
    ProcessingToolCalls(Vec<ToolCall>),
}

impl TurnState {
    fn from_calls(calls: Vec<ToolCall>) -> Self {
        if calls.is_empty() {
            TurnState::AwaitingInput
        } else {
            TurnState::ProcessingToolCalls(calls)
        }
    }
}

/// Drives the conversation: user input in, tool calls dispatched, reply out
pub struct ChatSession<C: ChatClient> {
    client: C,
    tools: ToolRegistry,
    options: SessionOptions,
    context: ConversationContext,
}

impl<C: ChatClient> ChatSession<C> {
    pub fn new(client: C, tools: ToolRegistry, options: SessionOptions) -> Self {
        Self {
            client,
            tools,
            options,
            context: ConversationContext::new(),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Messages retained across turns; empty unless history is enabled
    pub fn history(&self) -> &[Message] {
        self.context.messages()
    }

    async fn send(&mut self, message: Message) -> Result<ChatResponse, LlmError> {
        if !self.options.keep_history {
            return self.client.send(&message.content, message.role).await;
        }

        self.context.push(message);
        match self
            .client
            .send_messages(self.context.messages().to_vec())
            .await
        {
            Ok(response) => {
                self.context.push(response.message.clone());
                Ok(response)
            }
            Err(e) => {
                self.context.pop();
                Err(e)
            }
        }
    }

    /// Resolve one user turn, including every tool round-trip it triggers
    ///
    /// Fails only when the initial user message cannot be sent; failures
    /// further in are recorded on the outcome and reported to `observer`.
    pub async fn run_turn(
        &mut self,
        input: &str,
        observer: &mut dyn TurnObserver,
    ) -> Result<TurnOutcome, LlmError> {
        let mut response = self.send(Message::user(input)).await?;
        let mut log = Vec::new();
        let mut aborted = None;
        let max_rounds = self.options.max_tool_rounds.max(1);
        let mut rounds = 0;
        let mut state = TurnState::from_calls(response.tool_calls().to_vec());

        while let TurnState::ProcessingToolCalls(pending) = state {
            if rounds >= max_rounds {
                tracing::warn!(
                    "Reached {} tool rounds, dropping {} pending tool call(s)",
                    max_rounds,
                    pending.len()
                );
                break;
            }
            rounds += 1;
            tracing::trace!(round = rounds, calls = pending.len(), "Processing tool calls");

            let mut next = Vec::new();
            for call in pending {
                observer.on_tool_call(call.name(), call.arguments());

                let Some(tool) = self.tools.lookup(call.name()) else {
                    tracing::info!("Tool '{}' not registered, skipping", call.name());
                    observer.on_tool_unavailable(call.name(), &self.tools.names());
                    log.push(ToolCallLog {
                        tool: call.name().to_string(),
                        args: call.arguments().clone(),
                        outcome: ToolOutcome::Unavailable,
                    });
                    continue;
                };

                let content = match tool.invoke(call.arguments()).await {
                    Ok(output) => {
                        log.push(ToolCallLog {
                            tool: call.name().to_string(),
                            args: call.arguments().clone(),
                            outcome: ToolOutcome::Completed(output.clone()),
                        });
                        output
                    }
                    Err(e) => {
                        tracing::warn!(tool = %call.name(), "Tool invocation failed: {}", e);
                        observer.on_tool_error(call.name(), &e);
                        log.push(ToolCallLog {
                            tool: call.name().to_string(),
                            args: call.arguments().clone(),
                            outcome: ToolOutcome::Failed(e.to_string()),
                        });
                        match self.options.error_mode {
                            ErrorMode::Lenient => String::new(),
                            ErrorMode::Strict => format!("Error: {}", e),
                        }
                    }
                };

                match self.send(Message::tool(content)).await {
                    Ok(reply) => {
                        next.extend(reply.tool_calls().iter().cloned());
                        response = reply;
                    }
                    Err(e) => {
                        tracing::warn!("Tool result send failed, aborting turn: {}", e);
                        observer.on_send_error(&e);
                        aborted = Some(e);
                        break;
                    }
                }
            }

            state = if aborted.is_some() {
                TurnState::AwaitingInput
            } else {
                TurnState::from_calls(next)
            };
        }

        Ok(TurnOutcome {
            response,
            tool_calls: log,
            aborted,
        })
    }

    /// Read lines from `input` until EOF, answering each one
    ///
    /// Per-turn failures are printed and the loop moves on; only write
    /// failures on `output` end it early.
    pub async fn run<R, W>(&mut self, mut input: R, output: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut transcript = Transcript::new(output);

        loop {
            transcript.prompt()?;

            let mut line = String::new();
            match input.read_line(&mut line).await {
                Ok(0) => {
                    transcript.newline()?;
                    tracing::debug!("Input closed, ending session");
                    return Ok(());
                }
                Ok(_) => {}
                Err(e) => {
                    transcript.error(&e)?;
                    continue;
                }
            }

            let text = line.trim_end_matches(['\r', '\n']);
            if text.trim().is_empty() {
                continue;
            }

            match self.run_turn(text, &mut transcript).await {
                Ok(outcome) => transcript.reply(outcome.response.content())?,
                Err(e) => transcript.error(&e)?,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;
    use crate::tools::ToolError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Client that replays canned replies and records every request
    #[derive(Default)]
    struct ScriptedClient {
        replies: Mutex<VecDeque<Result<ChatResponse, LlmError>>>,
        sent: Mutex<Vec<Vec<Message>>>,
    }

    impl ScriptedClient {
        fn new(replies: Vec<Result<ChatResponse, LlmError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                sent: Mutex::new(Vec::new()),
            }
        }

        fn sent(&self) -> Vec<Vec<Message>> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatClient for ScriptedClient {
        async fn send_messages(&self, messages: Vec<Message>) -> Result<ChatResponse, LlmError> {
            self.sent.lock().unwrap().push(messages);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(ChatResponse::default()))
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl TurnObserver for Recorder {
        fn on_tool_call(&mut self, name: &str, _arguments: &Value) {
            self.events.push(format!("call {}", name));
        }
        fn on_tool_unavailable(&mut self, name: &str, _available: &[&str]) {
            self.events.push(format!("unavailable {}", name));
        }
        fn on_tool_error(&mut self, name: &str, _error: &ToolError) {
            self.events.push(format!("tool error {}", name));
        }
        fn on_send_error(&mut self, _error: &LlmError) {
            self.events.push("send error".to_string());
        }
    }

    fn text(content: &str) -> Result<ChatResponse, LlmError> {
        Ok(ChatResponse {
            message: Message::assistant(content),
        })
    }

    fn calls(calls: Vec<ToolCall>) -> Result<ChatResponse, LlmError> {
        Ok(ChatResponse {
            message: Message {
                role: Role::Assistant,
                content: String::new(),
                tool_calls: calls,
            },
        })
    }

    fn weather(args: Value) -> ToolCall {
        ToolCall::new("get_current_weather", args)
    }

    fn session(
        replies: Vec<Result<ChatResponse, LlmError>>,
        options: SessionOptions,
    ) -> ChatSession<ScriptedClient> {
        ChatSession::new(
            ScriptedClient::new(replies),
            ToolRegistry::with_defaults(),
            options,
        )
    }

    #[tokio::test]
    async fn weather_call_is_dispatched_and_reported_back() {
        let mut session = session(
            vec![
                calls(vec![weather(json!({"Location": "Paris"}))]),
                text("It is sunny in Paris."),
            ],
            SessionOptions::default(),
        );
        let mut recorder = Recorder::default();

        let outcome = session
            .run_turn("What's the weather in Paris?", &mut recorder)
            .await
            .unwrap();

        assert_eq!(outcome.response.content(), "It is sunny in Paris.");
        assert!(outcome.aborted.is_none());
        assert_eq!(outcome.tool_calls.len(), 1);
        assert_eq!(
            outcome.tool_calls[0].outcome,
            ToolOutcome::Completed("sunny".to_string())
        );

        let sent = session.client().sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], vec![Message::user("What's the weather in Paris?")]);
        assert_eq!(sent[1], vec![Message::tool("sunny")]);
        assert_eq!(recorder.events, vec!["call get_current_weather"]);
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn plain_reply_needs_no_follow_up() {
        let mut session = session(vec![text("Hello!")], SessionOptions::default());
        let outcome = session.run_turn("hi", &mut Recorder::default()).await.unwrap();

        assert_eq!(outcome.response.content(), "Hello!");
        assert!(outcome.tool_calls.is_empty());
        assert_eq!(session.client().sent().len(), 1);
    }

    #[tokio::test]
    async fn unknown_tool_is_skipped_without_follow_up() {
        let first = calls(vec![ToolCall::new("get_stock_price", json!({"ticker": "ACME"}))]);
        let mut session = session(vec![first], SessionOptions::default());
        let mut recorder = Recorder::default();

        let outcome = session.run_turn("price?", &mut recorder).await.unwrap();

        assert_eq!(session.client().sent().len(), 1);
        assert_eq!(outcome.tool_calls[0].outcome, ToolOutcome::Unavailable);
        assert_eq!(outcome.response.tool_calls()[0].name(), "get_stock_price");
        assert_eq!(
            recorder.events,
            vec!["call get_stock_price", "unavailable get_stock_price"]
        );
    }

    #[tokio::test]
    async fn malformed_arguments_send_empty_result_when_lenient() {
        let mut session = session(
            vec![calls(vec![weather(json!("{\"location\": "))]), text("ok")],
            SessionOptions::default(),
        );
        let mut recorder = Recorder::default();

        let outcome = session.run_turn("weather?", &mut recorder).await.unwrap();

        assert!(matches!(outcome.tool_calls[0].outcome, ToolOutcome::Failed(_)));
        assert_eq!(session.client().sent()[1], vec![Message::tool("")]);
        assert_eq!(outcome.response.content(), "ok");
        assert!(recorder.events.contains(&"tool error get_current_weather".to_string()));
    }

    #[tokio::test]
    async fn malformed_arguments_send_error_text_when_strict() {
        let options = SessionOptions {
            error_mode: ErrorMode::Strict,
            ..SessionOptions::default()
        };
        let mut session = session(
            vec![calls(vec![weather(json!(42))]), text("ok")],
            options,
        );

        session.run_turn("weather?", &mut Recorder::default()).await.unwrap();

        let follow_up = &session.client().sent()[1][0];
        assert_eq!(follow_up.role, Role::Tool);
        assert!(follow_up
            .content
            .starts_with("Error: invalid arguments for 'get_current_weather'"));
    }

    #[tokio::test]
    async fn failed_follow_up_aborts_remaining_calls() {
        let first = calls(vec![
            weather(json!({"location": "Paris"})),
            weather(json!({"location": "Rome"})),
        ]);
        let mut session = session(
            vec![first, Err(LlmError::Network("Connection failed".to_string()))],
            SessionOptions::default(),
        );
        let mut recorder = Recorder::default();

        let outcome = session.run_turn("two cities", &mut recorder).await.unwrap();

        assert_eq!(session.client().sent().len(), 2);
        assert!(matches!(outcome.aborted, Some(LlmError::Network(_))));
        assert_eq!(outcome.response.tool_calls().len(), 2);
        assert_eq!(
            recorder.events,
            vec!["call get_current_weather", "send error"]
        );
    }

    #[tokio::test]
    async fn failed_initial_send_is_an_error() {
        let mut session = session(
            vec![Err(LlmError::Network("Connection failed".to_string()))],
            SessionOptions::default(),
        );
        let err = session
            .run_turn("hi", &mut Recorder::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Network(_)));
    }

    #[tokio::test]
    async fn follow_up_tool_calls_are_bounded() {
        let looping: Vec<_> = (0..10)
            .map(|_| calls(vec![weather(json!({"location": "Paris"}))]))
            .collect();
        let options = SessionOptions {
            max_tool_rounds: 3,
            ..SessionOptions::default()
        };
        let mut session = session(looping, options);

        let outcome = session.run_turn("loop", &mut Recorder::default()).await.unwrap();

        assert_eq!(session.client().sent().len(), 4);
        assert_eq!(outcome.tool_calls.len(), 3);
        assert!(outcome.response.has_tool_calls());
    }

    #[tokio::test]
    async fn zero_round_limit_still_dispatches_first_calls() {
        let options = SessionOptions {
            max_tool_rounds: 0,
            ..SessionOptions::default()
        };
        let mut session = session(
            vec![
                calls(vec![weather(json!({"Location": "Paris"}))]),
                text("It is sunny in Paris."),
            ],
            options,
        );

        let outcome = session.run_turn("Paris?", &mut Recorder::default()).await.unwrap();

        assert_eq!(outcome.response.content(), "It is sunny in Paris.");
        assert_eq!(session.client().sent()[1], vec![Message::tool("sunny")]);
    }

    #[tokio::test]
    async fn history_is_resent_when_enabled() {
        let options = SessionOptions {
            keep_history: true,
            ..SessionOptions::default()
        };
        let mut session = session(
            vec![
                text("Hi Ada."),
                calls(vec![weather(json!({"location": "Paris"}))]),
                text("Sunny."),
            ],
            options,
        );

        session.run_turn("I am Ada", &mut Recorder::default()).await.unwrap();
        session.run_turn("Weather?", &mut Recorder::default()).await.unwrap();

        let sent = session.client().sent();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0].len(), 1);
        let second: Vec<_> = sent[1].iter().map(|m| (m.role, m.content.as_str())).collect();
        assert_eq!(
            second,
            vec![
                (Role::User, "I am Ada"),
                (Role::Assistant, "Hi Ada."),
                (Role::User, "Weather?"),
            ]
        );
        let third = &sent[2];
        assert_eq!(third.len(), 5);
        assert!(!third[3].tool_calls.is_empty());
        assert_eq!(third[4], Message::tool("sunny"));
        assert_eq!(session.history().len(), 6);
    }

    #[tokio::test]
    async fn failed_send_is_not_kept_in_history() {
        let options = SessionOptions {
            keep_history: true,
            ..SessionOptions::default()
        };
        let mut session = session(
            vec![Err(LlmError::Network("down".to_string())), text("Back.")],
            options,
        );

        assert!(session.run_turn("first", &mut Recorder::default()).await.is_err());
        assert!(session.history().is_empty());
        session.run_turn("second", &mut Recorder::default()).await.unwrap();
        assert_eq!(session.client().sent()[1], vec![Message::user("second")]);
    }

    #[tokio::test]
    async fn repl_answers_each_line_and_skips_blank_ones() {
        colored::control::set_override(false);
        let mut session = session(
            vec![
                calls(vec![weather(json!({"Location": "Paris"}))]),
                text("It is sunny in Paris."),
                Err(LlmError::Network("Connection failed".to_string())),
            ],
            SessionOptions::default(),
        );
        let input: &[u8] = b"What's the weather in Paris?\r\n\n   \nagain\n";
        let mut out = Vec::new();

        session.run(input, &mut out).await.unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains(
            "<calling function: get_current_weather with args: {\"Location\":\"Paris\"}>"
        ));
        assert!(out.contains("<agent> It is sunny in Paris."));
        assert!(out.contains("An error occurred: unable to execute request: Connection failed"));

        let sent = session.client().sent();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0][0].content, "What's the weather in Paris?");
        assert_eq!(sent[2][0].content, "again");
    }
}
