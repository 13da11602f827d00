//! Ollama chat client (non-streaming `/api/chat`)

use super::{ChatClient, ChatRequest, ChatResponse, ErrorMode, LlmError, Message, ToolDescriptor};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

pub const DEFAULT_URL: &str = "http://localhost:11434/api/chat";
pub const DEFAULT_MODEL: &str = "mistral:7b";

/// Client bound to one endpoint and one model
///
/// Holds no conversation state; every call builds a fresh request.
pub struct OllamaClient {
    client: reqwest::Client,
    url: String,
    model: String,
    options: Option<HashMap<String, Value>>,
    tools: Vec<ToolDescriptor>,
    error_mode: ErrorMode,
    timeout: Option<Duration>,
}

impl OllamaClient {
    /// Create a client for `url` and `model` carrying the built-in tool descriptors
    pub fn new(url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            model: model.into(),
            options: None,
            tools: crate::tools::default_descriptors(),
            error_mode: ErrorMode::default(),
            timeout: None,
        }
    }

    /// Model options forwarded verbatim; an empty map sends none
    pub fn with_options(mut self, options: HashMap<String, Value>) -> Self {
        self.options = if options.is_empty() {
            None
        } else {
            Some(options)
        };
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDescriptor>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build the request body for `messages`
    pub fn build_request(&self, messages: Vec<Message>) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages,
            stream: false,
            options: self.options.clone(),
            tools: self.tools.clone(),
        }
    }

    fn endpoint(&self) -> Result<Url, LlmError> {
        let url = Url::parse(&self.url).map_err(|e| LlmError::InvalidUrl {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(LlmError::InvalidUrl {
                url: self.url.clone(),
                reason: format!("unsupported scheme '{}'", other),
            }),
        }
    }
}

#[async_trait]
impl ChatClient for OllamaClient {
    async fn send_messages(&self, messages: Vec<Message>) -> Result<ChatResponse, LlmError> {
        let request = self.build_request(messages);
        let body = serde_json::to_vec(&request).map_err(LlmError::Serialize)?;
        let url = self.endpoint()?;

        tracing::debug!(
            model = %self.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending chat request to {}",
            url
        );
        tracing::trace!("Request body: {}", String::from_utf8_lossy(&body));

        let mut builder = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(LlmError::from_network_error)?;
        let status = response.status();

        // Drain the body in every case so the connection goes back to the pool.
        let raw = response.bytes().await;

        if status != StatusCode::OK {
            let body = match &raw {
                Ok(raw) => String::from_utf8_lossy(raw).into_owned(),
                Err(e) => format!("<unreadable body: {}>", e),
            };
            return match self.error_mode {
                ErrorMode::Strict => Err(LlmError::Status { status, body }),
                ErrorMode::Lenient => {
                    tracing::warn!(
                        status = %status,
                        "Ollama returned non-200, treating as empty reply: {}",
                        body
                    );
                    Ok(ChatResponse::default())
                }
            };
        }

        let raw = raw.map_err(|e| LlmError::ReadBody(e.to_string()))?;
        tracing::trace!("Response body: {}", String::from_utf8_lossy(&raw));
        let parsed: ChatResponse = serde_json::from_slice(&raw).map_err(LlmError::Parse)?;
        tracing::debug!(
            content_len = parsed.content().len(),
            tool_calls = parsed.tool_calls().len(),
            "Received chat reply"
        );
        Ok(parsed)
    }
}
