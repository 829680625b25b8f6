//! Input validation for commands, timeouts and paths.

use std::path::Path;

use thiserror::Error;

use crate::execution::{CommandRequest, Invocation};

/// Longest path accepted by [`CommandValidator::validate_path`].
const MAX_PATH_LENGTH: usize = 4096;

/// Validation configuration.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Maximum command length in characters.
    pub max_command_length: usize,
    /// Maximum timeout in seconds. `None` accepts any positive timeout.
    pub max_timeout_secs: Option<u64>,
    /// Whether to block dangerous commands.
    pub block_dangerous: bool,
    /// Extra substrings that reject a command outright.
    pub blocked_patterns: Vec<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_command_length: 4096,
            max_timeout_secs: None,
            block_dangerous: true,
            blocked_patterns: Vec::new(),
        }
    }
}

impl ValidationConfig {
    /// Trusted callers: long commands, long timeouts, nothing blocked.
    pub fn permissive() -> Self {
        Self {
            max_command_length: 65536,
            max_timeout_secs: None,
            block_dangerous: false,
            blocked_patterns: Vec::new(),
        }
    }

    /// Untrusted callers.
    pub fn strict() -> Self {
        Self {
            max_command_length: 1024,
            max_timeout_secs: Some(60),
            block_dangerous: true,
            blocked_patterns: vec![
                "rm -rf".to_string(),
                "mkfs".to_string(),
                "dd if=".to_string(),
                ":(){".to_string(),
                "curl ".to_string(),
                "wget ".to_string(),
            ],
        }
    }
}

/// Rejects requests before they reach the executor.
#[derive(Debug, Default)]
pub struct CommandValidator {
    config: ValidationConfig,
}

impl CommandValidator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validate every part of a built request.
    pub fn validate_request(&self, request: &CommandRequest) -> Result<(), ValidationError> {
        match request.invocation() {
            Invocation::Shell(line) => self.validate_command(line)?,
            Invocation::Argv { program, args } => {
                self.validate_command(&request.display())?;
                if program.contains('\0') || args.iter().any(|a| a.contains('\0')) {
                    return Err(ValidationError::InvalidCharacter('\0'));
                }
            }
        }
        self.validate_timeout(request.timeout_secs())?;
        if let Some(dir) = request.working_dir() {
            self.validate_path(dir)?;
        }
        Ok(())
    }

    /// Validate a command string.
    pub fn validate_command(&self, command: &str) -> Result<(), ValidationError> {
        if command.len() > self.config.max_command_length {
            return Err(ValidationError::CommandTooLong {
                length: command.len(),
                max: self.config.max_command_length,
            });
        }
        if command.trim().is_empty() {
            return Err(ValidationError::EmptyCommand);
        }
        if command.contains('\0') {
            return Err(ValidationError::InvalidCharacter('\0'));
        }

        if self.config.block_dangerous {
            if let Some(pattern) = dangerous_pattern(command) {
                return Err(ValidationError::DangerousCommand {
                    pattern: pattern.to_string(),
                });
            }
        }

        if let Some(pattern) = self
            .config
            .blocked_patterns
            .iter()
            .find(|p| command.contains(p.as_str()))
        {
            return Err(ValidationError::BlockedPattern {
                pattern: pattern.clone(),
            });
        }

        Ok(())
    }

    /// Timeouts must be positive and within the configured ceiling, if any.
    pub fn validate_timeout(&self, timeout_secs: u64) -> Result<(), ValidationError> {
        if timeout_secs == 0 {
            return Err(ValidationError::NonPositiveTimeout);
        }
        match self.config.max_timeout_secs {
            Some(max) if timeout_secs > max => Err(ValidationError::TimeoutTooLong {
                value: timeout_secs,
                max,
            }),
            _ => Ok(()),
        }
    }

    /// Validate a file or working-directory path.
    pub fn validate_path(&self, path: &Path) -> Result<(), ValidationError> {
        let text = path.to_string_lossy();
        if text.trim().is_empty() {
            return Err(ValidationError::EmptyPath);
        }
        if text.contains('\0') {
            return Err(ValidationError::InvalidCharacter('\0'));
        }
        if path
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(ValidationError::PathTraversal);
        }
        if text.len() > MAX_PATH_LENGTH {
            return Err(ValidationError::PathTooLong {
                length: text.len(),
                max: MAX_PATH_LENGTH,
            });
        }
        Ok(())
    }
}

/// Validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Command too long: {length} chars (max: {max})")]
    CommandTooLong { length: usize, max: usize },
    #[error("Command cannot be empty")]
    EmptyCommand,
    #[error("Dangerous command pattern detected: {pattern}")]
    DangerousCommand { pattern: String },
    #[error("Command contains blocked pattern: {pattern}")]
    BlockedPattern { pattern: String },
    #[error("Input contains invalid character: {0:?}")]
    InvalidCharacter(char),
    #[error("Timeout must be a positive number of seconds")]
    NonPositiveTimeout,
    #[error("Timeout too long: {value}s (max: {max}s)")]
    TimeoutTooLong { value: u64, max: u64 },
    #[error("Path cannot be empty")]
    EmptyPath,
    #[error("Path traversal detected")]
    PathTraversal,
    #[error("Path too long: {length} chars (max: {max})")]
    PathTooLong { length: usize, max: usize },
}

/// Prefixes that run the word after them as the actual program.
const COMMAND_WRAPPERS: &[&str] = &["sudo", "env", "nohup", "exec", "time", "nice", "command"];

/// Looks at the program word of every simple command, so arguments such as
/// `echo reboot` or `rm -rf /tmp/x` pass.
fn dangerous_pattern(command: &str) -> Option<&'static str> {
    let lower = command.to_lowercase();
    let compact: String = lower.chars().filter(|c| !c.is_whitespace()).collect();

    if compact.contains(":(){") {
        return Some("fork bomb");
    }
    if compact.contains(">/dev/sd") || compact.contains(">/dev/nvme") {
        return Some("device overwrite");
    }

    lower
        .split(|c: char| matches!(c, ';' | '|' | '&' | '(' | ')' | '`' | '\n'))
        .find_map(dangerous_invocation)
}

fn dangerous_invocation(segment: &str) -> Option<&'static str> {
    let mut words = segment
        .split_whitespace()
        .skip_while(|w| COMMAND_WRAPPERS.contains(w) || w.starts_with('-') || is_assignment(w));

    let program = words.next()?;
    let program = program.rsplit('/').next().unwrap_or(program);
    let args: Vec<&str> = words.collect();

    match program {
        "rm" if removes_root(&args) => Some("rm -rf /"),
        "shutdown" | "reboot" | "halt" | "poweroff" => Some("system shutdown"),
        "init" if matches!(args.first().copied(), Some("0") | Some("6")) => Some("system shutdown"),
        "fdisk" | "parted" | "wipefs" => Some("disk formatting"),
        p if p == "mkfs" || p.starts_with("mkfs.") => Some("disk formatting"),
        "dd" if args
            .iter()
            .any(|a| a.starts_with("of=/dev/") && *a != "of=/dev/null") =>
        {
            Some("raw disk write")
        }
        _ => None,
    }
}

/// Recursive forced removal whose target is the filesystem root itself.
fn removes_root(args: &[&str]) -> bool {
    let mut recursive = false;
    let mut force = false;
    let mut root = false;

    for arg in args {
        match *arg {
            "--recursive" => recursive = true,
            "--force" => force = true,
            "/" | "/*" => root = true,
            flags if flags.starts_with('-') && !flags.starts_with("--") => {
                recursive |= flags.contains('r');
                force |= flags.contains('f');
            }
            _ => {}
        }
    }
    recursive && force && root
}

fn is_assignment(word: &str) -> bool {
    match word.split_once('=') {
        Some((name, _)) => {
            !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    }
}

/// Strip control characters and cap length, for log lines.
pub fn sanitize_for_display(command: &str) -> String {
    command
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .take(1000)
        .collect()
}
