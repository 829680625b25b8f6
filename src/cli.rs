//! Command-line interface for agent-tools.

use std::ffi::OsString;
use std::net::IpAddr;
use std::path::PathBuf;

/// Command-line arguments.
///
/// `None` means "not given"; the config file or environment decides.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Host address to bind to.
    pub host: Option<IpAddr>,
    /// Port to listen on.
    pub port: Option<u16>,
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// API key for authentication (overrides config file).
    pub api_key: Option<String>,
    /// Default command timeout in seconds.
    pub timeout: Option<u64>,
    /// Disable authentication.
    pub no_auth: bool,
    /// Disable rate limiting.
    pub no_rate_limit: bool,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// Print a fresh API key and exit.
    pub generate_key: bool,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('H') | Long("host") => {
                let value: String = parser.value()?.parse()?;
                result.host = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("host", value))?,
                );
            }
            Short('p') | Long("port") => {
                let value: String = parser.value()?.parse()?;
                result.port = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("port", value))?,
                );
            }
            Short('t') | Long("timeout") => {
                let value: String = parser.value()?.parse()?;
                let secs: u64 = value
                    .parse()
                    .ok()
                    .filter(|&s| s > 0)
                    .ok_or(ArgsError::InvalidValue("timeout", value))?;
                result.timeout = Some(secs);
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Short('k') | Long("api-key") => {
                result.api_key = Some(parser.value()?.parse()?);
            }
            Long("no-auth") => {
                result.no_auth = true;
            }
            Long("no-rate-limit") => {
                result.no_rate_limit = true;
            }
            Long("generate-key") => {
                result.generate_key = true;
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Value(val) => {
                return Err(ArgsError::UnexpectedArgument(val.to_string_lossy().into()));
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    Ok(result)
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"agent-tools {version}
Command execution and port probing tools for AI agents, served over HTTP

USAGE:
    agent-tools [OPTIONS]

OPTIONS:
    -H, --host <ADDR>       Host address to bind [default: 127.0.0.1]
    -p, --port <PORT>       Port to listen on [default: 3000]
    -c, --config <FILE>     Path to configuration file (JSON)
    -k, --api-key <KEY>     API key for authentication
    -t, --timeout <SECS>    Default command timeout [default: 60]
    -l, --log-level <LVL>   Log level (error, warn, info, debug, trace)
        --no-auth           Disable authentication
        --no-rate-limit     Disable rate limiting
        --generate-key      Print a new API key and exit
    -h, --help              Print help
    -V, --version           Print version

ENVIRONMENT VARIABLES:
    AGENT_TOOLS_HOST             Host address (overrides config)
    AGENT_TOOLS_PORT             Port number (overrides config)
    AGENT_TOOLS_API_KEY          API key (overrides config)
    AGENT_TOOLS_DEFAULT_TIMEOUT  Default command timeout in seconds
    AGENT_TOOLS_LOG_LEVEL        Log level (overrides config)
    RUST_LOG                     Alternative log level setting

EXAMPLES:
    # Start with defaults (localhost:3000, no auth)
    agent-tools

    # Start on all interfaces with API key
    agent-tools -H 0.0.0.0 -p 8080 -k my-secret-key

    # Start with config file and a 30 second default timeout
    agent-tools -c /etc/agent-tools/config.json -t 30

    # Development mode (no security)
    agent-tools --no-auth --no-rate-limit
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("agent-tools {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    Lexopt(lexopt::Error),
    /// Invalid argument value.
    InvalidValue(&'static str, String),
    /// Unexpected positional argument.
    UnexpectedArgument(String),
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexopt(e) => write!(f, "{}", e),
            Self::InvalidValue(name, value) => {
                write!(f, "invalid value for --{}: '{}'", name, value)
            }
            Self::UnexpectedArgument(arg) => {
                write!(f, "unexpected argument: '{}'", arg)
            }
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<lexopt::Error> for ArgsError {
    fn from(e: lexopt::Error) -> Self {
        Self::Lexopt(e)
    }
}
