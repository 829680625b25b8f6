//! Security layer for the tool server.
//!
//! - **API Key Authentication**: Bearer token check on every route but `/health`
//! - **Rate Limiting**: per-IP sliding window
//! - **Input Validation**: command, timeout and path checks before execution
//!
//! ## Example
//!
//! ```rust
//! use agent_tools::security::{ApiKeyStore, CommandValidator, RateLimiter};
//!
//! let auth = ApiKeyStore::default();
//! auth.add_key("my-secret-key");
//!
//! let limiter = RateLimiter::default();
//!
//! let validator = CommandValidator::default();
//! assert!(validator.validate_command("echo hello").is_ok());
//! ```

pub mod auth;
pub mod rate_limit;
pub mod validation;

pub use auth::{auth_middleware, generate_api_key, ApiKeyStore, AuthConfig};
pub use rate_limit::{rate_limit_middleware, RateLimitConfig, RateLimiter};
pub use validation::{sanitize_for_display, CommandValidator, ValidationConfig, ValidationError};
