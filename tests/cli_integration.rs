//! CLI integration tests.
//!
//! These tests verify argument parsing and the configuration priority chain.

use std::ffi::OsString;
use std::io::Write;
use tempfile::NamedTempFile;

use agent_tools::cli::{parse_args_from, Args};
use agent_tools::config::{Config, ConfigError};

fn args(args: &[&str]) -> Vec<OsString> {
    std::iter::once("agent-tools")
        .chain(args.iter().copied())
        .map(OsString::from)
        .collect()
}

fn config_file(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file
}

// ============================================================================
// CLI Argument Tests
// ============================================================================

#[test]
fn test_cli_defaults() {
    let result = parse_args_from(args(&[])).unwrap();

    assert!(result.host.is_none());
    assert!(result.port.is_none());
    assert!(result.timeout.is_none());
    assert!(!result.no_auth);
    assert!(!result.no_rate_limit);
    assert!(result.config.is_none());
    assert!(result.api_key.is_none());
}

#[test]
fn test_cli_full_options() {
    let result = parse_args_from(args(&[
        "-H",
        "0.0.0.0",
        "-p",
        "8080",
        "-k",
        "my-api-key",
        "-l",
        "debug",
        "--timeout",
        "90",
        "--no-rate-limit",
    ]))
    .unwrap();

    assert_eq!(result.host.unwrap().to_string(), "0.0.0.0");
    assert_eq!(result.port, Some(8080));
    assert_eq!(result.api_key, Some("my-api-key".to_string()));
    assert_eq!(result.log_level, Some("debug".to_string()));
    assert_eq!(result.timeout, Some(90));
    assert!(result.no_rate_limit);
    assert!(!result.no_auth);
}

#[test]
fn test_cli_rejects_bad_values() {
    assert!(parse_args_from(args(&["-p", "not-a-number"])).is_err());
    assert!(parse_args_from(args(&["-H", "not-an-ip"])).is_err());
    assert!(parse_args_from(args(&["-t", "0"])).is_err());
    assert!(parse_args_from(args(&["--bogus"])).is_err());
}

// ============================================================================
// Configuration Loading Tests
// ============================================================================

#[test]
fn test_config_from_json_file() {
    let file = config_file(
        r#"{
        "server": {
            "host": "192.168.1.100",
            "port": 9000,
            "graceful_shutdown": false
        },
        "security": {
            "auth": {
                "enabled": true,
                "api_keys": ["key1", "key2"]
            },
            "rate_limit": {
                "enabled": true,
                "requests_per_window": 50,
                "window_secs": 30
            },
            "validation": {
                "block_dangerous": false,
                "blocked_patterns": ["curl "]
            }
        },
        "executor": {
            "default_timeout_secs": 20,
            "grace_period_ms": 100
        },
        "logging": {
            "level": "debug"
        }
    }"#,
    );

    let config = Config::from_file(file.path()).unwrap();

    assert_eq!(config.server.host, "192.168.1.100");
    assert_eq!(config.server.port, 9000);
    assert!(!config.server.graceful_shutdown);
    assert!(config.security.auth.enabled);
    assert_eq!(config.security.auth.api_keys.len(), 2);
    assert_eq!(config.security.rate_limit.requests_per_window, 50);
    assert!(!config.security.validation.block_dangerous);
    assert_eq!(config.executor.default_timeout_secs, 20);
    assert_eq!(config.logging.level, "debug");

    let server = config.to_server_config().unwrap();
    assert!(!server.graceful_shutdown);
    assert!(server.security.auth.enabled);
    assert_eq!(server.security.api_keys.len(), 2);
    assert_eq!(server.security.rate_limit.max_requests, 50);
    assert_eq!(server.security.validation.blocked_patterns, vec!["curl ".to_string()]);
    assert_eq!(server.default_timeout_secs, 20);
}

#[test]
fn test_config_priority_cli_over_file() {
    let file = config_file(
        r#"{
        "server": { "host": "10.0.0.1", "port": 5000 },
        "executor": { "default_timeout_secs": 45 }
    }"#,
    );

    let args = Args {
        host: Some("192.168.1.1".parse().unwrap()),
        port: Some(8080),
        timeout: Some(10),
        config: Some(file.path().to_path_buf()),
        ..Args::default()
    };

    let config = Config::load(&args).unwrap();

    assert_eq!(config.server.host, "192.168.1.1");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.executor.default_timeout_secs, 10);
}

#[test]
fn test_config_file_kept_when_cli_silent() {
    let file = config_file(r#"{ "server": { "port": 5000 } }"#);

    let args = Args {
        config: Some(file.path().to_path_buf()),
        ..Args::default()
    };

    let config = Config::load(&args).unwrap();
    assert_eq!(config.server.port, 5000);
}

#[test]
fn test_config_api_key_enables_auth() {
    let args = Args {
        api_key: Some("secret-key".to_string()),
        ..Args::default()
    };

    let config = Config::load(&args).unwrap();
    assert!(config.security.auth.enabled);
    assert!(config
        .security
        .auth
        .api_keys
        .contains(&"secret-key".to_string()));

    let server = config.to_server_config().unwrap();
    assert!(server.security.auth.enabled);
}

#[test]
fn test_config_no_auth_overrides_key() {
    let args = Args {
        api_key: Some("secret-key".to_string()),
        no_auth: true,
        ..Args::default()
    };

    let config = Config::load(&args).unwrap();
    assert!(!config.security.auth.enabled);
}

#[test]
fn test_config_missing_file() {
    let args = Args {
        config: Some("/nonexistent/agent-tools.json".into()),
        ..Args::default()
    };

    assert!(matches!(Config::load(&args), Err(ConfigError::Io(_))));
}

#[test]
fn test_config_auth_without_keys_is_an_error() {
    let file = config_file(r#"{ "security": { "auth": { "enabled": true } } }"#);
    let config = Config::from_file(file.path()).unwrap();

    let err = config.to_server_config().unwrap_err();
    assert!(err.to_string().contains("no API key"));
}

#[test]
fn test_cli_timeout_above_configured_ceiling_is_an_error() {
    let file = config_file(r#"{ "security": { "validation": { "max_timeout_secs": 300 } } }"#);
    let parsed = parse_args_from(args(&[
        "--config",
        file.path().to_str().unwrap(),
        "-t",
        "600",
    ]))
    .unwrap();

    let config = Config::load(&parsed).unwrap();
    assert_eq!(config.executor.default_timeout_secs, 600);
    assert!(matches!(
        config.to_server_config(),
        Err(ConfigError::DefaultTimeoutTooLong { default: 600, max: 300 })
    ));
}
