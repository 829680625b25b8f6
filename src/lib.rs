//! # agent-tools
//!
//! Command execution and port probing for AI agents.
//!
//! The core is a synchronous command executor: run a shell command line
//! with a timeout, capture exit code, stdout and stderr, and kill the whole
//! process group if the deadline passes. Timeouts and launch failures never
//! surface as errors; they come back as a [`CommandResult`] with exit code
//! `-1` and a structured [`Outcome`].
//!
//! Around it sit a direct TCP port probe, text file tools, a tool registry
//! for agent dispatch, and an HTTP API.
//!
//! ## Quick Start
//!
//! ```no_run
//! use agent_tools::{execute_with_timeout, check_port, Outcome};
//! use std::time::Duration;
//!
//! fn main() -> agent_tools::Result<()> {
//!     let result = execute_with_timeout("echo hello", 5)?;
//!     assert_eq!(result.exit_code, 0);
//!     assert_eq!(result.stdout.as_deref(), Some("hello\n"));
//!
//!     let slow = execute_with_timeout("sleep 10", 1)?;
//!     assert_eq!(slow.exit_code, -1);
//!     assert_eq!(slow.outcome, Outcome::TimedOut);
//!
//!     let probe = check_port("localhost", 22, Duration::from_secs(2));
//!     println!("ssh reachable: {}", probe.is_reachable());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod execution;
pub mod files;
pub mod logging;
pub mod probe;
pub mod security;
pub mod tools;

pub use error::{Result, ToolError};
pub use execution::{
    execute, execute_with_timeout, CommandExecutor, CommandRequest, CommandResult, Outcome,
    SENTINEL_EXIT_CODE,
};
pub use probe::{check_port, PortProbe, PortStatus};
pub use tools::{Tool, ToolOutput, ToolRegistry};
