//! Command requests and their builder.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ToolError;
use crate::Result;

/// Default execution timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// How the child process is launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Command line handed verbatim to the shell (`sh -c` / `cmd /C`).
    Shell(String),
    /// Program plus explicit arguments, no shell interpretation.
    Argv { program: String, args: Vec<String> },
}

/// A validated, immutable request to run one command.
#[derive(Debug, Clone)]
pub struct CommandRequest {
    invocation: Invocation,
    timeout_secs: u64,
    working_dir: Option<PathBuf>,
    env: HashMap<String, String>,
}

impl CommandRequest {
    /// Shell command with the default 60 second timeout.
    pub fn new(command: impl Into<String>) -> Result<Self> {
        CommandBuilder::new().command_line(command).build()
    }

    /// Shell command with an explicit timeout.
    pub fn with_timeout(command: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        CommandBuilder::new()
            .command_line(command)
            .timeout_secs(timeout_secs)
            .build()
    }

    /// Program and arguments run directly, without a shell.
    pub fn argv<I, S>(program: impl Into<String>, args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandBuilder::new().program(program, args).build()
    }

    /// Start a builder.
    pub fn builder() -> CommandBuilder {
        CommandBuilder::new()
    }

    pub fn invocation(&self) -> &Invocation {
        &self.invocation
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    pub fn env(&self) -> &HashMap<String, String> {
        &self.env
    }

    /// The command text echoed back in results and log lines.
    pub fn display(&self) -> String {
        match &self.invocation {
            Invocation::Shell(line) => line.clone(),
            Invocation::Argv { program, args } => {
                let mut out = program.clone();
                for arg in args {
                    out.push(' ');
                    out.push_str(arg);
                }
                out
            }
        }
    }
}

/// Builder for [`CommandRequest`].
#[derive(Debug)]
pub struct CommandBuilder {
    invocation: Option<Invocation>,
    working_dir: Option<PathBuf>,
    env: HashMap<String, String>,
    timeout_secs: u64,
}

impl Default for CommandBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandBuilder {
    /// Create a new command builder.
    pub fn new() -> Self {
        Self {
            invocation: None,
            working_dir: None,
            env: HashMap::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Set a shell command line.
    pub fn command_line(mut self, cmd: impl Into<String>) -> Self {
        self.invocation = Some(Invocation::Shell(cmd.into()));
        self
    }

    /// Set a program and argument vector instead of a shell line.
    pub fn program<I, S>(mut self, program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.invocation = Some(Invocation::Argv {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Set the working directory.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Add an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Add multiple environment variables.
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in vars {
            self.env.insert(k.into(), v.into());
        }
        self
    }

    /// Set the execution timeout in seconds.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Build the request.
    ///
    /// Fails if no command was given, the command (or program) is blank,
    /// or the timeout is zero.
    pub fn build(self) -> Result<CommandRequest> {
        let invocation = self.invocation.ok_or(ToolError::EmptyCommand)?;
        let blank = match &invocation {
            Invocation::Shell(line) => line.trim().is_empty(),
            Invocation::Argv { program, .. } => program.trim().is_empty(),
        };
        if blank {
            return Err(ToolError::EmptyCommand);
        }
        if self.timeout_secs == 0 {
            return Err(ToolError::InvalidTimeout(self.timeout_secs));
        }

        Ok(CommandRequest {
            invocation,
            timeout_secs: self.timeout_secs,
            working_dir: self.working_dir,
            env: self.env,
        })
    }
}
