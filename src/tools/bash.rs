use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{parse_input, Tool, ToolOutput};
use crate::error::Result;
use crate::execution::{CommandExecutor, CommandRequest};
use crate::security::{sanitize_for_display, CommandValidator};

/// Runs a shell command line and returns its [`crate::CommandResult`].
#[derive(Debug, Clone)]
pub struct ExecuteBashTool {
    executor: CommandExecutor,
    validator: Arc<CommandValidator>,
    default_timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
struct ExecuteBashInput {
    command: String,
    #[serde(default)]
    timeout: Option<u64>,
}

impl ExecuteBashTool {
    pub fn new(
        executor: CommandExecutor,
        validator: Arc<CommandValidator>,
        default_timeout_secs: u64,
    ) -> Self {
        Self {
            executor,
            validator,
            default_timeout_secs,
        }
    }
}

#[async_trait]
impl Tool for ExecuteBashTool {
    fn name(&self) -> &'static str {
        "execute_bash"
    }

    fn description(&self) -> &'static str {
        "Execute a shell command and return its exit code, stdout and stderr. \
         The command is killed along with its child processes when the timeout expires."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "Command line passed to the system shell"
                },
                "timeout": {
                    "type": "integer",
                    "minimum": 1,
                    "description": format!("Timeout in seconds (default: {})", self.default_timeout_secs)
                }
            },
            "required": ["command"]
        })
    }

    async fn call(&self, input: Value) -> Result<ToolOutput> {
        let input: ExecuteBashInput = parse_input(self.name(), input)?;
        let timeout = input.timeout.unwrap_or(self.default_timeout_secs);

        let request = match CommandRequest::with_timeout(input.command, timeout) {
            Ok(request) => request,
            Err(e) => return Ok(ToolOutput::error(e.to_string())),
        };
        if let Err(e) = self.validator.validate_request(&request) {
            debug!(command = %sanitize_for_display(&request.display()), error = %e, "command rejected");
            return Ok(ToolOutput::error(e.to_string()));
        }

        let result = self.executor.execute_async(request).await;
        ToolOutput::json(&result)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::security::ValidationConfig;

    fn tool() -> ExecuteBashTool {
        ExecuteBashTool::new(
            CommandExecutor::new(),
            Arc::new(CommandValidator::default()),
            60,
        )
    }

    #[tokio::test]
    async fn test_runs_command() {
        let output = tool()
            .call(json!({ "command": "echo hello" }))
            .await
            .unwrap();

        assert!(!output.is_error);
        assert_eq!(output.value["command"], "echo hello");
        assert_eq!(output.value["exit_code"], 0);
        assert_eq!(output.value["stdout"], "hello\n");
        assert_eq!(output.value["stderr"], "");
    }

    #[tokio::test]
    async fn test_timeout_reports_sentinel() {
        let output = tool()
            .call(json!({ "command": "sleep 10", "timeout": 1 }))
            .await
            .unwrap();

        assert!(!output.is_error);
        assert_eq!(output.value["exit_code"], -1);
        assert_eq!(output.value["outcome"], "timed_out");
        assert!(output.value["stderr"]
            .as_str()
            .unwrap()
            .contains("timed out after 1 seconds"));
    }

    #[tokio::test]
    async fn test_zero_timeout_rejected() {
        let output = tool()
            .call(json!({ "command": "echo hi", "timeout": 0 }))
            .await
            .unwrap();
        assert!(output.is_error);
    }

    #[tokio::test]
    async fn test_dangerous_command_rejected() {
        let output = tool()
            .call(json!({ "command": "rm -rf /" }))
            .await
            .unwrap();
        assert!(output.is_error);
        assert!(output.as_text().unwrap().contains("Dangerous"));
    }

    #[tokio::test]
    async fn test_dangerous_words_as_arguments_run() {
        let output = tool()
            .call(json!({ "command": "echo reboot" }))
            .await
            .unwrap();
        assert!(!output.is_error);
        assert_eq!(output.value["stdout"], "reboot\n");

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("x");
        std::fs::create_dir(&target).unwrap();
        let output = tool()
            .call(json!({ "command": format!("rm -rf {}", target.display()) }))
            .await
            .unwrap();
        assert!(!output.is_error);
        assert_eq!(output.value["exit_code"], 0);
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn test_long_timeout_accepted_by_default() {
        let output = tool()
            .call(json!({ "command": "echo hi", "timeout": 600 }))
            .await
            .unwrap();
        assert!(!output.is_error);
        assert_eq!(output.value["exit_code"], 0);
    }

    #[tokio::test]
    async fn test_validator_timeout_ceiling() {
        let strict = ExecuteBashTool::new(
            CommandExecutor::new(),
            Arc::new(CommandValidator::new(ValidationConfig::strict())),
            30,
        );
        let output = strict
            .call(json!({ "command": "echo hi", "timeout": 120 }))
            .await
            .unwrap();
        assert!(output.is_error);
    }

    #[tokio::test]
    async fn test_missing_command_is_invalid_input() {
        let err = tool().call(json!({ "timeout": 5 })).await.unwrap_err();
        assert!(matches!(err, crate::ToolError::InvalidInput(_)));
    }
}
