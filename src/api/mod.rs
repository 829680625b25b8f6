//! HTTP API for the agent tools.
//!
//! ## Endpoints
//!
//! ### Health & Info
//! - `GET /health` - Health check (never requires a key)
//! - `GET /api/v1/` - API information
//!
//! ### Execution
//! - `POST /api/v1/execute` - Run a command and return its `CommandResult`
//! - `POST /api/v1/probe` - Check whether a TCP port accepts connections
//!
//! ### Tools
//! - `GET /api/v1/tools` - List tools with their input schemas
//! - `POST /api/v1/tools/{name}` - Call a tool with a JSON input object
//!
//! ## Example
//!
//! ```no_run
//! use agent_tools::api::{serve, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> agent_tools::Result<()> {
//!     let config = ServerConfig::new("127.0.0.1", 3000);
//!     serve(config).await
//! }
//! ```

pub mod handlers;
pub mod router;
pub mod types;

pub use handlers::AppState;
pub use router::{
    create_router, create_router_with_state, create_secure_router, serve, serve_with_state,
    SecurityConfig, ServerConfig,
};
pub use types::{ApiInfo, ErrorResponse, ExecuteRequest, ProbeRequest, ToolCallResponse};
