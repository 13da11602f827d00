//! Typed errors for chat requests
//!
//! Each stage of a request/response cycle fails with its own variant so the
//! caller can report what went wrong without string matching.

use thiserror::Error;

/// Chat request errors
///
/// - `Serialize` - request body could not be encoded
/// - `InvalidUrl` - configured endpoint is not a valid URL
/// - `Network` - connection refused, DNS failure, timeout
/// - `ReadBody` - response body could not be read
/// - `Parse` - response body is not a valid chat reply
/// - `Status` - non-200 reply, only raised in strict mode
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("unable to marshal request body: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("unable to create request for '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Transport failure before a status line was received
    #[error("unable to execute request: {0}")]
    Network(String),

    #[error("unable to read response body: {0}")]
    ReadBody(String),

    #[error("unable to unmarshal response body: {0}")]
    Parse(#[source] serde_json::Error),

    /// Server answered with something other than 200
    #[error("Ollama API error ({status}): {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

impl LlmError {
    /// Convert network/connection errors into typed LlmError
    pub fn from_network_error(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Network(format!("Request timeout: {}", e))
        } else if e.is_connect() {
            LlmError::Network(format!("Connection failed: {}", e))
        } else {
            LlmError::Network(e.to_string())
        }
    }
}
