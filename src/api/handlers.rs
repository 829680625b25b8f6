//! REST API handlers.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use super::types::{ApiInfo, ErrorResponse, ExecuteRequest, ProbeRequest, ToolCallResponse};
use crate::error::ToolError;
use crate::execution::{CommandExecutor, CommandResult};
use crate::probe::{check_port_async, DEFAULT_PROBE_HOST};
use crate::security::CommandValidator;
use crate::tools::{ToolDescriptor, ToolRegistry, ToolsConfig};

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Shared application state.
#[derive(Clone, Debug)]
pub struct AppState {
    pub executor: CommandExecutor,
    pub validator: Arc<CommandValidator>,
    pub registry: Arc<ToolRegistry>,
    pub default_timeout_secs: u64,
    pub probe_timeout: Duration,
}

impl AppState {
    pub fn new() -> Self {
        Self::from_tools_config(ToolsConfig::default())
    }

    /// State whose endpoints and builtin tools share one executor and validator.
    pub fn from_tools_config(config: ToolsConfig) -> Self {
        let registry = Arc::new(ToolRegistry::with_builtins(&config));
        Self {
            executor: config.executor,
            validator: config.validator,
            registry,
            default_timeout_secs: config.default_timeout_secs,
            probe_timeout: config.probe_timeout,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

fn bad_request(err: impl ToString) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::bad_request(err.to_string())),
    )
}

/// Health check endpoint.
pub async fn health() -> &'static str {
    "OK"
}

/// API information endpoint.
pub async fn api_info(State(state): State<AppState>) -> Json<ApiInfo> {
    let tools = state
        .registry
        .names()
        .into_iter()
        .map(str::to_string)
        .collect();
    Json(ApiInfo::new(tools, state.default_timeout_secs))
}

/// Execute a command and wait for its result.
///
/// Timeouts and launch failures are still `200 OK`; the outcome is in the body.
pub async fn execute(
    State(state): State<AppState>,
    Json(req): Json<ExecuteRequest>,
) -> Result<Json<CommandResult>, ApiError> {
    let request = req
        .into_command(state.default_timeout_secs)
        .map_err(bad_request)?;
    state.validator.validate_request(&request).map_err(bad_request)?;

    Ok(Json(state.executor.execute_async(request).await))
}

/// Check whether a TCP port accepts connections.
pub async fn probe(
    State(state): State<AppState>,
    Json(req): Json<ProbeRequest>,
) -> Result<Json<CommandResult>, ApiError> {
    let timeout = match req.timeout_secs {
        Some(0) => return Err(bad_request(ToolError::InvalidTimeout(0))),
        Some(secs) => Duration::from_secs(secs),
        None => state.probe_timeout,
    };
    let host = req
        .host
        .filter(|h| !h.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_PROBE_HOST.to_string());

    let probe = check_port_async(host, req.port, timeout).await;
    Ok(Json(probe.into_command_result()))
}

/// List registered tools.
pub async fn list_tools(State(state): State<AppState>) -> Json<Vec<ToolDescriptor>> {
    Json(state.registry.descriptors())
}

/// Call a tool by name with a JSON input object.
pub async fn call_tool(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(input): Json<Value>,
) -> Result<Json<ToolCallResponse>, ApiError> {
    match state.registry.call(&name, input).await {
        Ok(output) => Ok(Json(ToolCallResponse::new(name, output))),
        Err(ToolError::ToolNotFound(_)) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::tool_not_found(&name)),
        )),
        Err(e @ ToolError::InvalidInput(_)) => Err(bad_request(e)),
        Err(e) => {
            tracing::error!(tool = %name, error = %e, "tool call failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::internal_error(e.to_string())),
            ))
        }
    }
}
