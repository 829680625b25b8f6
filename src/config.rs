//! Configuration management for agent-tools.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::api::{SecurityConfig, ServerConfig};
use crate::cli::Args;
use crate::execution::{ExecutorConfig, DEFAULT_TIMEOUT_SECS};
use crate::security::{AuthConfig, RateLimitConfig, ValidationConfig};

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerSection,
    pub security: SecuritySection,
    pub executor: ExecutorSection,
    pub logging: LoggingSection,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Enable graceful shutdown.
    pub graceful_shutdown: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            graceful_shutdown: true,
        }
    }
}

/// Security configuration section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecuritySection {
    pub auth: AuthSection,
    pub rate_limit: RateLimitSection,
    pub validation: ValidationSection,
}

/// Authentication configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    pub enabled: bool,
    pub api_keys: Vec<String>,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSection {
    pub enabled: bool,
    /// Requests per window.
    pub requests_per_window: u32,
    /// Window size in seconds.
    pub window_secs: u64,
}

impl Default for RateLimitSection {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_window: 100,
            window_secs: 60,
        }
    }
}

/// Command validation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSection {
    pub block_dangerous: bool,
    pub max_command_length: usize,
    /// Ceiling for request timeouts; unset accepts any positive value.
    pub max_timeout_secs: Option<u64>,
    pub blocked_patterns: Vec<String>,
}

impl Default for ValidationSection {
    fn default() -> Self {
        let defaults = ValidationConfig::default();
        Self {
            block_dangerous: defaults.block_dangerous,
            max_command_length: defaults.max_command_length,
            max_timeout_secs: defaults.max_timeout_secs,
            blocked_patterns: defaults.blocked_patterns,
        }
    }
}

/// Command executor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorSection {
    /// Timeout applied when a request names none.
    pub default_timeout_secs: u64,
    /// Time between SIGTERM and SIGKILL when a command times out.
    pub grace_period_ms: u64,
    /// Shell used for command lines instead of the platform default.
    pub shell: Option<String>,
}

impl Default for ExecutorSection {
    fn default() -> Self {
        Self {
            default_timeout_secs: DEFAULT_TIMEOUT_SECS,
            grace_period_ms: ExecutorConfig::default().grace_period.as_millis() as u64,
            shell: None,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level or filter directive (error, warn, info, debug, trace).
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// Unparseable numeric values are ignored.
    pub fn apply_env_from<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = var("AGENT_TOOLS_HOST") {
            self.server.host = host;
        }

        if let Some(port) = var("AGENT_TOOLS_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }

        if let Some(key) = var("AGENT_TOOLS_API_KEY").filter(|k| !k.is_empty()) {
            self.add_api_key(key);
        }

        if let Some(secs) = var("AGENT_TOOLS_DEFAULT_TIMEOUT").and_then(|t| t.parse().ok()) {
            self.executor.default_timeout_secs = secs;
        }

        if let Some(level) = var("AGENT_TOOLS_LOG_LEVEL").or_else(|| var("RUST_LOG")) {
            self.logging.level = level;
        }
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(host) = args.host {
            self.server.host = host.to_string();
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }

        if let Some(ref key) = args.api_key {
            self.add_api_key(key.clone());
        }

        if args.no_auth {
            self.security.auth.enabled = false;
        }

        if args.no_rate_limit {
            self.security.rate_limit.enabled = false;
        }

        if let Some(secs) = args.timeout {
            self.executor.default_timeout_secs = secs;
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    fn add_api_key(&mut self, key: String) {
        self.security.auth.enabled = true;
        if !self.security.auth.api_keys.contains(&key) {
            self.security.auth.api_keys.push(key);
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = match args.config {
            Some(ref path) => Config::from_file(path)?,
            None => Config::default(),
        };

        config.apply_env();
        config.apply_args(args);

        Ok(config)
    }

    /// Convert to ServerConfig for the API server.
    pub fn to_server_config(&self) -> Result<ServerConfig, ConfigError> {
        let host: IpAddr = self
            .server
            .host
            .parse()
            .map_err(|_| ConfigError::InvalidHost(self.server.host.clone()))?;

        if self.executor.default_timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout(0));
        }
        if let Some(max) = self.security.validation.max_timeout_secs {
            if self.executor.default_timeout_secs > max {
                return Err(ConfigError::DefaultTimeoutTooLong {
                    default: self.executor.default_timeout_secs,
                    max,
                });
            }
        }
        if self.auth_enabled_without_keys() {
            return Err(ConfigError::MissingApiKey);
        }

        let mut security = if self.security.auth.enabled {
            SecurityConfig::secure()
        } else {
            SecurityConfig::development()
        };

        security.auth = AuthConfig {
            enabled: self.security.auth.enabled,
            ..AuthConfig::default()
        };

        security.rate_limit = RateLimitConfig {
            enabled: self.security.rate_limit.enabled,
            max_requests: self.security.rate_limit.requests_per_window,
            window: Duration::from_secs(self.security.rate_limit.window_secs),
            ..RateLimitConfig::default()
        };

        let validation = &self.security.validation;
        security.validation = ValidationConfig {
            max_command_length: validation.max_command_length,
            max_timeout_secs: validation.max_timeout_secs,
            block_dangerous: validation.block_dangerous,
            blocked_patterns: validation.blocked_patterns.clone(),
        };

        for key in &self.security.auth.api_keys {
            security = security.with_api_key(key);
        }

        let executor = ExecutorConfig {
            shell: self.executor.shell.clone(),
            grace_period: Duration::from_millis(self.executor.grace_period_ms),
        };

        let mut server_config = ServerConfig::new(host.to_string(), self.server.port)
            .with_security(security)
            .with_executor(executor)
            .with_default_timeout(self.executor.default_timeout_secs);

        if !self.server.graceful_shutdown {
            server_config = server_config.without_graceful_shutdown();
        }

        Ok(server_config)
    }

    fn auth_enabled_without_keys(&self) -> bool {
        self.security.auth.enabled && self.security.auth.api_keys.is_empty()
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(std::io::Error),
    /// JSON parsing error.
    Json(serde_json::Error),
    /// Invalid host address.
    InvalidHost(String),
    /// Default command timeout must be positive.
    InvalidTimeout(u64),
    /// Default command timeout exceeds the validation ceiling.
    DefaultTimeoutTooLong { default: u64, max: u64 },
    /// Authentication enabled with no keys configured.
    MissingApiKey,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
            Self::InvalidHost(host) => write!(f, "invalid host address: {}", host),
            Self::InvalidTimeout(secs) => {
                write!(f, "invalid default timeout: {}s (must be positive)", secs)
            }
            Self::DefaultTimeoutTooLong { default, max } => write!(
                f,
                "default timeout {}s exceeds validation.max_timeout_secs ({}s)",
                default, max
            ),
            Self::MissingApiKey => write!(
                f,
                "authentication is enabled but no API key is configured (use --api-key or --no-auth)"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}
