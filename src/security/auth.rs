//! API key authentication.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::api::types::ErrorResponse;

/// Paths reachable without a key.
const PUBLIC_PATHS: &[&str] = &["/health"];

/// API key configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Whether authentication is enabled.
    pub enabled: bool,
    /// Scheme prefix in the Authorization header (default: "Bearer ").
    pub prefix: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            prefix: "Bearer ".to_string(),
        }
    }
}

impl AuthConfig {
    /// Create a disabled auth config (for development).
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

/// Thread-safe API key store.
#[derive(Debug)]
pub struct ApiKeyStore {
    keys: RwLock<HashSet<String>>,
    config: AuthConfig,
}

impl ApiKeyStore {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            keys: RwLock::new(HashSet::new()),
            config,
        }
    }

    /// Store pre-loaded with keys.
    pub fn with_keys<I, S>(config: AuthConfig, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new(config);
        for key in keys {
            store.add_key(key);
        }
        store
    }

    /// Create a store with authentication disabled.
    pub fn disabled() -> Self {
        Self::new(AuthConfig::disabled())
    }

    pub fn add_key(&self, key: impl Into<String>) {
        if let Ok(mut keys) = self.keys.write() {
            keys.insert(key.into());
        }
    }

    pub fn remove_key(&self, key: &str) -> bool {
        self.keys
            .write()
            .map(|mut keys| keys.remove(key))
            .unwrap_or(false)
    }

    pub fn is_valid(&self, key: &str) -> bool {
        self.keys
            .read()
            .map(|keys| keys.contains(key))
            .unwrap_or(false)
    }

    pub fn count(&self) -> usize {
        self.keys.read().map(|k| k.len()).unwrap_or(0)
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Extract the key from an Authorization header value.
    pub fn extract_key<'a>(&self, header_value: &'a str) -> Option<&'a str> {
        header_value
            .strip_prefix(self.config.prefix.as_str())
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// Whether a request carrying this header may proceed.
    pub fn authorize(&self, header_value: Option<&str>) -> bool {
        if !self.is_enabled() {
            return true;
        }
        header_value
            .and_then(|h| self.extract_key(h))
            .map(|key| self.is_valid(key))
            .unwrap_or(false)
    }
}

impl Default for ApiKeyStore {
    fn default() -> Self {
        Self::new(AuthConfig::default())
    }
}

/// Authentication middleware for axum.
pub async fn auth_middleware(
    State(store): State<Arc<ApiKeyStore>>,
    request: Request,
    next: Next,
) -> Response {
    if PUBLIC_PATHS.contains(&request.uri().path()) {
        return next.run(request).await;
    }

    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    if store.authorize(header) {
        next.run(request).await
    } else {
        tracing::debug!(path = %request.uri().path(), "rejected unauthenticated request");
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::unauthorized()),
        )
            .into_response()
    }
}

/// Generate an API key.
///
/// Derived from the clock; suitable for local setups, not as a secret
/// generator for shared deployments.
pub fn generate_api_key() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0) as u64;
    let mixed = nanos
        .wrapping_mul(0x9E37_79B9_7F4A_7C15)
        .rotate_left(17)
        ^ u64::from(std::process::id());
    format!("at_{:x}_{:016x}", nanos, mixed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_config_default() {
        let config = AuthConfig::default();
        assert!(config.enabled);
        assert_eq!(config.prefix, "Bearer ");
        assert!(!AuthConfig::disabled().enabled);
    }

    #[test]
    fn test_api_key_store_add_remove() {
        let store = ApiKeyStore::default();

        store.add_key("test-key-123");
        assert!(store.is_valid("test-key-123"));
        assert!(!store.is_valid("invalid-key"));
        assert_eq!(store.count(), 1);

        assert!(store.remove_key("test-key-123"));
        assert!(!store.is_valid("test-key-123"));
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_extract_key() {
        let store = ApiKeyStore::default();
        assert_eq!(store.extract_key("Bearer my-secret-key"), Some("my-secret-key"));
        assert_eq!(store.extract_key("Bearer "), None);
        assert_eq!(store.extract_key("Basic credentials"), None);
    }

    #[test]
    fn test_authorize() {
        let store = ApiKeyStore::with_keys(AuthConfig::default(), ["k1", "k2"]);
        assert!(store.authorize(Some("Bearer k2")));
        assert!(!store.authorize(Some("Bearer k3")));
        assert!(!store.authorize(None));

        let open = ApiKeyStore::disabled();
        assert!(open.authorize(None));
    }

    #[test]
    fn test_generate_api_key() {
        let key1 = generate_api_key();
        std::thread::sleep(std::time::Duration::from_millis(1));
        let key2 = generate_api_key();

        assert!(key1.starts_with("at_"));
        assert_ne!(key1, key2);
    }
}
