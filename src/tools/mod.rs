//! Agent-facing tools.
//!
//! Each tool takes a JSON object and returns a [`ToolOutput`]. Failures the
//! caller should see (a missing file, a rejected command) come back as error
//! outputs; only malformed input and dispatch problems are `Err`.
//!
//! ```no_run
//! use agent_tools::tools::{ToolRegistry, ToolsConfig};
//! use serde_json::json;
//!
//! # async fn run() -> agent_tools::Result<()> {
//! let registry = ToolRegistry::with_builtins(&ToolsConfig::default());
//! let output = registry
//!     .call("execute_bash", json!({ "command": "echo hello", "timeout": 5 }))
//!     .await?;
//! assert!(!output.is_error);
//! # Ok(())
//! # }
//! ```

mod bash;
mod clock;
mod file;
mod port;
mod registry;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, ToolError};
use crate::execution::{CommandExecutor, DEFAULT_TIMEOUT_SECS};
use crate::probe::DEFAULT_PROBE_TIMEOUT;
use crate::security::CommandValidator;

pub use bash::ExecuteBashTool;
pub use clock::CurrentTimeTool;
pub use file::{CreateOutlineTool, EditDocumentTool, ReadFileTool, WriteFileTool};
pub use port::CheckPortTool;
pub use registry::ToolRegistry;

/// A callable tool.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name used for dispatch.
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// JSON Schema of the input object.
    fn schema(&self) -> Value;

    async fn call(&self, input: Value) -> Result<ToolOutput>;

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.schema(),
        }
    }
}

/// Name, description and input schema of a tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// What a tool call produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolOutput {
    pub value: Value,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            value: Value::String(text.into()),
            is_error: false,
        }
    }

    pub fn json<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Self {
            value: serde_json::to_value(value)?,
            is_error: false,
        })
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            value: Value::String(message.into()),
            is_error: true,
        }
    }

    /// The value as text, if it is a JSON string.
    pub fn as_text(&self) -> Option<&str> {
        self.value.as_str()
    }
}

/// Shared dependencies of the builtin tools.
#[derive(Debug, Clone)]
pub struct ToolsConfig {
    pub executor: CommandExecutor,
    pub validator: Arc<CommandValidator>,
    /// Applied when `execute_bash` is called without a timeout.
    pub default_timeout_secs: u64,
    pub probe_timeout: Duration,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            executor: CommandExecutor::new(),
            validator: Arc::new(CommandValidator::default()),
            default_timeout_secs: DEFAULT_TIMEOUT_SECS,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

fn parse_input<T: DeserializeOwned>(tool: &str, input: Value) -> Result<T> {
    serde_json::from_value(input).map_err(|e| ToolError::InvalidInput(format!("{}: {}", tool, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_output_constructors() {
        let ok = ToolOutput::text("done");
        assert!(!ok.is_error);
        assert_eq!(ok.as_text(), Some("done"));

        let err = ToolOutput::error("boom");
        assert!(err.is_error);
        assert_eq!(err.value, json!("boom"));

        let structured = ToolOutput::json(&json!({ "a": 1 })).unwrap();
        assert_eq!(structured.value["a"], 1);
        assert_eq!(structured.as_text(), None);
    }

    #[test]
    fn test_parse_input_reports_tool_name() {
        #[derive(serde::Deserialize, Debug)]
        struct Input {
            #[allow(dead_code)]
            port: u16,
        }

        let err = parse_input::<Input>("check_port_open", json!({ "port": "eighty" })).unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
        assert!(err.to_string().contains("check_port_open"));
    }

    #[test]
    fn test_tools_config_default() {
        let config = ToolsConfig::default();
        assert_eq!(config.default_timeout_secs, 60);
        assert_eq!(config.probe_timeout, Duration::from_secs(10));
    }
}
