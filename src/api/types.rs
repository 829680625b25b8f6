//! API request and response types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::execution::CommandRequest;
use crate::tools::ToolOutput;

/// Request to execute a command.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteRequest {
    /// Shell command line, or the program when `args` is present.
    pub command: String,
    /// Timeout in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Optional working directory override.
    #[serde(default)]
    pub working_dir: Option<String>,
    /// Optional environment variables.
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Arguments passed directly to `command`, bypassing the shell.
    #[serde(default)]
    pub args: Option<Vec<String>>,
}

impl ExecuteRequest {
    /// Build the executor request, using `default_timeout_secs` when no
    /// timeout was given.
    pub fn into_command(self, default_timeout_secs: u64) -> crate::Result<CommandRequest> {
        let mut builder = CommandRequest::builder()
            .timeout_secs(self.timeout_secs.unwrap_or(default_timeout_secs))
            .envs(self.env);
        builder = match self.args {
            Some(args) => builder.program(self.command, args),
            None => builder.command_line(self.command),
        };
        if let Some(dir) = self.working_dir {
            builder = builder.working_dir(dir);
        }
        builder.build()
    }
}

/// Request to probe a TCP port.
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeRequest {
    #[serde(default)]
    pub host: Option<String>,
    pub port: u16,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Response for a tool call.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallResponse {
    pub tool: String,
    pub is_error: bool,
    pub content: Value,
}

impl ToolCallResponse {
    pub fn new(tool: impl Into<String>, output: ToolOutput) -> Self {
        Self {
            tool: tool.into(),
            is_error: output.is_error,
            content: output.value,
        }
    }
}

/// API information returned by `GET /api/v1/`.
#[derive(Debug, Clone, Serialize)]
pub struct ApiInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub status: &'static str,
    pub default_timeout_secs: u64,
    pub tools: Vec<String>,
}

impl ApiInfo {
    pub fn new(tools: Vec<String>, default_timeout_secs: u64) -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            status: "running",
            default_timeout_secs,
            tools,
        }
    }
}

/// Generic API error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "TOOL_NOT_FOUND").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn tool_not_found(name: &str) -> Self {
        Self::new("TOOL_NOT_FOUND", format!("Tool '{}' not found", name))
    }

    pub fn unauthorized() -> Self {
        Self::new("UNAUTHORIZED", "Missing or invalid API key")
    }

    pub fn rate_limited(retry_after_secs: u64) -> Self {
        Self::new("RATE_LIMITED", "Too many requests")
            .with_details(format!("retry after {}s", retry_after_secs))
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }
}
