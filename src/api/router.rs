//! API router configuration.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{api_info, call_tool, execute, health, list_tools, probe, AppState};
use crate::error::ToolError;
use crate::execution::{CommandExecutor, ExecutorConfig, DEFAULT_TIMEOUT_SECS};
use crate::probe::DEFAULT_PROBE_TIMEOUT;
use crate::security::{
    auth_middleware, rate_limit_middleware, ApiKeyStore, AuthConfig, CommandValidator,
    RateLimitConfig, RateLimiter, ValidationConfig,
};
use crate::tools::ToolsConfig;

/// Create the API router with default state and no auth or rate limiting.
pub fn create_router() -> Router {
    create_router_with_state(AppState::new())
}

/// Create the API router with custom state and no auth or rate limiting.
pub fn create_router_with_state(state: AppState) -> Router {
    with_common_layers(routes(state))
}

/// Create the API router with auth and rate limiting per `security`.
pub fn create_secure_router(state: AppState, security: &SecurityConfig) -> Router {
    let keys = ApiKeyStore::with_keys(security.auth.clone(), security.api_keys.iter().cloned());
    let limiter = RateLimiter::new(security.rate_limit.clone());

    let router = routes(state)
        .layer(middleware::from_fn_with_state(Arc::new(keys), auth_middleware))
        .layer(middleware::from_fn_with_state(
            Arc::new(limiter),
            rate_limit_middleware,
        ));
    with_common_layers(router)
}

fn routes(state: AppState) -> Router {
    let tool_routes = Router::new()
        .route("/", get(list_tools))
        .route("/{name}", post(call_tool));

    let api_v1 = Router::new()
        .route("/", get(api_info))
        .route("/execute", post(execute))
        .route("/probe", post(probe))
        .nest("/tools", tool_routes);

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_v1)
        .with_state(state)
}

fn with_common_layers(router: Router) -> Router {
    router.layer(TraceLayer::new_for_http()).layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    )
}

/// Security settings applied by [`create_secure_router`].
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub auth: AuthConfig,
    pub api_keys: Vec<String>,
    pub rate_limit: RateLimitConfig,
    pub validation: ValidationConfig,
}

impl SecurityConfig {
    /// Auth and rate limiting on, default validation.
    pub fn secure() -> Self {
        Self {
            auth: AuthConfig::default(),
            api_keys: Vec::new(),
            rate_limit: RateLimitConfig::default(),
            validation: ValidationConfig::default(),
        }
    }

    /// Auth and rate limiting off. Commands are still validated.
    pub fn development() -> Self {
        Self {
            auth: AuthConfig::disabled(),
            rate_limit: RateLimitConfig::disabled(),
            ..Self::secure()
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        if !self.api_keys.contains(&key) {
            self.api_keys.push(key);
        }
        self
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self::development()
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    pub security: SecurityConfig,
    pub executor: ExecutorConfig,
    /// Timeout applied when a request names none.
    pub default_timeout_secs: u64,
    /// Stop accepting connections on Ctrl-C / SIGTERM and drain in-flight requests.
    pub graceful_shutdown: bool,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn with_security(mut self, security: SecurityConfig) -> Self {
        self.security = security;
        self
    }

    pub fn with_executor(mut self, executor: ExecutorConfig) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_default_timeout(mut self, secs: u64) -> Self {
        self.default_timeout_secs = secs;
        self
    }

    pub fn without_graceful_shutdown(mut self) -> Self {
        self.graceful_shutdown = false;
        self
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Application state wired from this configuration.
    pub fn app_state(&self) -> AppState {
        AppState::from_tools_config(ToolsConfig {
            executor: CommandExecutor::with_config(self.executor.clone()),
            validator: Arc::new(CommandValidator::new(self.security.validation.clone())),
            default_timeout_secs: self.default_timeout_secs,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            security: SecurityConfig::default(),
            executor: ExecutorConfig::default(),
            default_timeout_secs: DEFAULT_TIMEOUT_SECS,
            graceful_shutdown: true,
        }
    }
}

/// Start the API server.
pub async fn serve(config: ServerConfig) -> crate::Result<()> {
    let state = config.app_state();
    serve_with_state(config, state).await
}

/// Start the API server with custom state.
pub async fn serve_with_state(config: ServerConfig, state: AppState) -> crate::Result<()> {
    let addr = config.bind_address();
    let router = create_secure_router(state, &config.security);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        %addr,
        auth = config.security.auth.enabled,
        rate_limit = config.security.rate_limit.enabled,
        "agent-tools API server listening"
    );

    let service = router.into_make_service_with_connect_info::<SocketAddr>();
    let served = if config.graceful_shutdown {
        axum::serve(listener, service)
            .with_graceful_shutdown(shutdown_signal())
            .await
    } else {
        axum::serve(listener, service).await
    };
    served.map_err(|e| ToolError::Server(e.to_string()))?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
