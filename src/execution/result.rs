//! Execution result types.

use std::time::Duration;

use serde::{Serialize, Serializer};

/// Exit code reported when the process did not exit normally.
pub const SENTINEL_EXIT_CODE: i32 = -1;

/// How an invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The process ran to completion; `exit_code` is its real status.
    Exited,
    /// The deadline passed and the process group was terminated.
    TimedOut,
    /// The process could not be started or waited on.
    LaunchFailed,
}

/// Result of one command invocation.
#[derive(Debug, Clone, Serialize)]
pub struct CommandResult {
    /// Echo of the requested command.
    pub command: String,
    /// Process exit status, or [`SENTINEL_EXIT_CODE`].
    pub exit_code: i32,
    /// Captured standard output. `None` unless the process exited.
    pub stdout: Option<String>,
    /// Captured standard error, or the failure description.
    pub stderr: String,
    /// Structured reason code.
    pub outcome: Outcome,
    /// Wall-clock time spent on the invocation.
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
}

fn serialize_millis<S: Serializer>(duration: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(duration.as_millis() as u64)
}

impl CommandResult {
    /// A normal exit with the real exit code and both streams.
    pub fn exited(
        command: impl Into<String>,
        exit_code: i32,
        stdout: String,
        stderr: String,
        duration: Duration,
    ) -> Self {
        Self {
            command: command.into(),
            exit_code,
            stdout: Some(stdout),
            stderr,
            outcome: Outcome::Exited,
            duration,
        }
    }

    /// A run that hit its deadline.
    pub fn timed_out(command: impl Into<String>, timeout_secs: u64, duration: Duration) -> Self {
        let command = command.into();
        let stderr = format!("Command '{}' timed out after {} seconds", command, timeout_secs);
        Self {
            command,
            exit_code: SENTINEL_EXIT_CODE,
            stdout: None,
            stderr,
            outcome: Outcome::TimedOut,
            duration,
        }
    }

    /// A run that never got going (or could not be waited on).
    pub fn launch_failed(
        command: impl Into<String>,
        reason: impl std::fmt::Display,
        duration: Duration,
    ) -> Self {
        Self {
            command: command.into(),
            exit_code: SENTINEL_EXIT_CODE,
            stdout: None,
            stderr: format!("Error executing command: {}", reason),
            outcome: Outcome::LaunchFailed,
            duration,
        }
    }

    /// Check if command succeeded (exited with code 0).
    pub fn success(&self) -> bool {
        self.outcome == Outcome::Exited && self.exit_code == 0
    }

    /// Whether the process ran to completion, whatever its code.
    pub fn completed(&self) -> bool {
        self.outcome == Outcome::Exited
    }

    pub fn is_timeout(&self) -> bool {
        self.outcome == Outcome::TimedOut
    }

    /// Stdout with surrounding whitespace removed; empty if absent.
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.as_deref().map(str::trim).unwrap_or("")
    }

    pub fn stderr_trimmed(&self) -> &str {
        self.stderr.trim()
    }

    /// Stdout lines; empty if absent.
    pub fn stdout_lines(&self) -> impl Iterator<Item = &str> {
        self.stdout.as_deref().unwrap_or("").lines()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exited_result() {
        let result = CommandResult::exited(
            "echo hello",
            0,
            "hello\n".into(),
            String::new(),
            Duration::from_millis(12),
        );

        assert_eq!(result.outcome, Outcome::Exited);
        assert_eq!(result.stdout.as_deref(), Some("hello\n"));
        assert_eq!(result.stdout_trimmed(), "hello");
        assert!(result.success());
        assert!(result.completed());
    }

    #[test]
    fn test_nonzero_exit_is_data() {
        let result = CommandResult::exited("false", 1, String::new(), String::new(), Duration::ZERO);
        assert!(!result.success());
        assert!(result.completed());
        assert_eq!(result.exit_code, 1);
    }

    #[test]
    fn test_timed_out_result() {
        let result = CommandResult::timed_out("sleep 5", 1, Duration::from_secs(1));
        assert_eq!(result.exit_code, SENTINEL_EXIT_CODE);
        assert!(result.stdout.is_none());
        assert_eq!(result.stderr, "Command 'sleep 5' timed out after 1 seconds");
        assert!(result.is_timeout());
        assert!(!result.completed());
    }

    #[test]
    fn test_launch_failed_result() {
        let result = CommandResult::launch_failed(
            "nope",
            "No such file or directory (os error 2)",
            Duration::ZERO,
        );
        assert_eq!(result.exit_code, -1);
        assert_eq!(result.outcome, Outcome::LaunchFailed);
        assert!(result.stderr.starts_with("Error executing command:"));
        assert_eq!(result.stdout_trimmed(), "");
    }

    #[test]
    fn test_stdout_lines() {
        let result = CommandResult::exited(
            "printf",
            0,
            "line1\nline2\nline3".into(),
            String::new(),
            Duration::ZERO,
        );
        let lines: Vec<_> = result.stdout_lines().collect();
        assert_eq!(lines, vec!["line1", "line2", "line3"]);
    }

    #[test]
    fn test_serialization_shape() {
        let result = CommandResult::timed_out("sleep 9", 2, Duration::from_millis(2004));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["command"], "sleep 9");
        assert_eq!(json["exit_code"], -1);
        assert!(json["stdout"].is_null());
        assert_eq!(json["outcome"], "timed_out");
        assert_eq!(json["duration_ms"], 2004);
    }
}
