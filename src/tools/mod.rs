//! Local tools the model can call
//!
//! A tool decodes its own argument shape from the raw JSON the model sends
//! and answers with plain text, which is fed back as a `tool` message.

mod weather;

pub use weather::WeatherTool;

use crate::llm::{ParameterSchema, ToolDescriptor};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Tool invocation errors
#[derive(Debug, Error)]
pub enum ToolError {
    /// Arguments could not be decoded into the tool's argument type
    #[error("invalid arguments for '{tool}': {source}")]
    InvalidArguments {
        tool: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("tool '{tool}' failed: {message}")]
    Failed { tool: String, message: String },
}

impl ToolError {
    /// Decode `arguments` into `T`, mapping failures to `InvalidArguments`
    ///
    /// Some models send the arguments object JSON-encoded as a string; that
    /// string is parsed first. `null` decodes like an empty object.
    pub fn decode<T: serde::de::DeserializeOwned>(
        tool: &str,
        arguments: &Value,
    ) -> Result<T, ToolError> {
        let decoded = match arguments {
            Value::String(raw) => serde_json::from_str(raw),
            Value::Null => T::deserialize(Value::Object(Default::default())),
            other => T::deserialize(other),
        };
        decoded.map_err(|source| ToolError::InvalidArguments {
            tool: tool.to_string(),
            source,
        })
    }
}

/// Trait for callable tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the model uses to call the tool
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Schema of the arguments object
    fn parameters(&self) -> ParameterSchema;

    /// Run the tool on the raw arguments from the model
    ///
    /// Malformed arguments must produce an error, never a panic.
    async fn invoke(&self, arguments: &Value) -> Result<String, ToolError>;

    /// Convert to the descriptor sent with each request
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::function(self.name(), self.description(), self.parameters())
    }
}

/// Descriptors of the built-in tool set
pub fn default_descriptors() -> Vec<ToolDescriptor> {
    vec![WeatherTool.descriptor()]
}

/// Name to tool mapping, built once at startup and read-only afterwards
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in tools
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(WeatherTool));
        tracing::debug!("Tool registry created with tools: {:?}", registry.names());
        registry
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Look a tool up by name; absence is a normal outcome
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Descriptors for all registered tools, sorted by name
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.names()
            .into_iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.descriptor())
            .collect()
    }
}
