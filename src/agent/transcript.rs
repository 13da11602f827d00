//! Terminal rendering of a chat session

use crate::llm::LlmError;
use crate::tools::ToolError;
use colored::Colorize;
use serde_json::Value;
use std::fmt::Display;
use std::io::{self, Write};

/// Hooks fired while a turn dispatches tool calls
pub trait TurnObserver {
    fn on_tool_call(&mut self, name: &str, arguments: &Value);
    fn on_tool_unavailable(&mut self, name: &str, available: &[&str]);
    fn on_tool_error(&mut self, name: &str, error: &ToolError);
    fn on_send_error(&mut self, error: &LlmError);
}

/// Observer that ignores every event
pub struct NoopObserver;

impl TurnObserver for NoopObserver {
    fn on_tool_call(&mut self, _name: &str, _arguments: &Value) {}
    fn on_tool_unavailable(&mut self, _name: &str, _available: &[&str]) {}
    fn on_tool_error(&mut self, _name: &str, _error: &ToolError) {}
    fn on_send_error(&mut self, _error: &LlmError) {}
}

/// Writes prompts, replies and tool activity to a terminal-like writer
pub struct Transcript<W: Write> {
    out: W,
}

impl<W: Write> Transcript<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn banner(&mut self, url: &str, model: &str) -> io::Result<()> {
        writeln!(
            self.out,
            "{}",
            format!("Connected to {} using model {}", url, model).cyan()
        )
    }

    pub fn prompt(&mut self) -> io::Result<()> {
        write!(self.out, "{} ", "<you>".green())?;
        self.out.flush()
    }

    pub fn reply(&mut self, content: &str) -> io::Result<()> {
        writeln!(self.out, "{} {}", "<agent>".cyan(), content)
    }

    pub fn error(&mut self, error: &dyn Display) -> io::Result<()> {
        writeln!(self.out, "{} {}", "An error occurred:".red(), error)
    }

    pub fn newline(&mut self) -> io::Result<()> {
        writeln!(self.out)
    }

    fn write_event(&mut self, line: String) {
        if let Err(e) = writeln!(self.out, "{}", line) {
            tracing::warn!("Failed to write transcript: {}", e);
        }
    }
}

impl<W: Write> TurnObserver for Transcript<W> {
    fn on_tool_call(&mut self, name: &str, arguments: &Value) {
        self.write_event(
            format!("<calling function: {} with args: {}>", name, arguments)
                .blue()
                .to_string(),
        );
    }

    fn on_tool_unavailable(&mut self, name: &str, available: &[&str]) {
        self.write_event(
            format!("tool {} not available: {:?}", name, available)
                .red()
                .to_string(),
        );
    }

    fn on_tool_error(&mut self, name: &str, error: &ToolError) {
        self.write_event(format!("tool {} failed: {}", name, error).red().to_string());
    }

    fn on_send_error(&mut self, error: &LlmError) {
        self.write_event(format!("{} {}", "An error occurred:".red(), error));
    }
}
