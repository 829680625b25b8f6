//! Command execution engine.
//!
//! This module provides command execution capabilities:
//! - Shell-line and argument-vector invocation
//! - Timeout handling with process-group termination
//! - Structured results instead of propagated errors
//!
//! # Example
//!
//! ```no_run
//! use agent_tools::execution::{execute_with_timeout, CommandRequest, CommandExecutor};
//!
//! // Simple one-shot execution
//! let result = execute_with_timeout("echo hello", 5).unwrap();
//! println!("exit {} stdout {:?}", result.exit_code, result.stdout);
//!
//! // Request with options
//! let request = CommandRequest::builder()
//!     .command_line("cargo build")
//!     .working_dir("/project")
//!     .timeout_secs(600)
//!     .build()
//!     .unwrap();
//! let result = CommandExecutor::new().execute(&request);
//! ```

mod command;
mod executor;
mod result;

pub use command::{CommandBuilder, CommandRequest, Invocation, DEFAULT_TIMEOUT_SECS};
pub use executor::{
    execute, execute_with_timeout, CommandExecutor, ExecutorConfig, DEFAULT_GRACE_PERIOD,
};
pub use result::{CommandResult, Outcome, SENTINEL_EXIT_CODE};
