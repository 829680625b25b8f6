//! Per-IP sliding window rate limiting.

use std::collections::{HashMap, VecDeque};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::RETRY_AFTER, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::api::types::ErrorResponse;

/// Rate limiter configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub max_requests: u32,
    /// Time window duration.
    pub window: Duration,
    /// Whether rate limiting is enabled.
    pub enabled: bool,
    /// Maximum number of tracked IPs.
    pub max_tracked_ips: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(60),
            enabled: true,
            max_tracked_ips: 10000,
        }
    }
}

impl RateLimitConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    pub fn custom(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
            ..Default::default()
        }
    }
}

#[derive(Debug)]
struct Window {
    hits: VecDeque<Instant>,
}

impl Window {
    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(&oldest) = self.hits.front() {
            if now.duration_since(oldest) >= window {
                self.hits.pop_front();
            } else {
                break;
            }
        }
    }

    fn last_hit(&self) -> Option<Instant> {
        self.hits.back().copied()
    }
}

/// Thread-safe rate limiter.
#[derive(Debug)]
pub struct RateLimiter {
    windows: Mutex<HashMap<IpAddr, Window>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            config,
        }
    }

    pub fn disabled() -> Self {
        Self::new(RateLimitConfig::disabled())
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn max_requests(&self) -> u32 {
        self.config.max_requests
    }

    /// Record a request from `ip`.
    ///
    /// Returns `Ok(remaining)` if allowed, `Err(retry_after)` if limited.
    pub fn check(&self, ip: IpAddr) -> Result<u32, Duration> {
        if !self.config.enabled {
            return Ok(self.config.max_requests);
        }

        let now = Instant::now();
        let mut windows = match self.windows.lock() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        };

        if windows.len() >= self.config.max_tracked_ips && !windows.contains_key(&ip) {
            self.evict(&mut windows, now);
        }

        let window = windows.entry(ip).or_insert_with(|| Window {
            hits: VecDeque::new(),
        });
        window.prune(now, self.config.window);

        let used = window.hits.len() as u32;
        if used >= self.config.max_requests {
            let retry_after = window
                .hits
                .front()
                .map(|&t| self.config.window.saturating_sub(now.duration_since(t)))
                .unwrap_or(self.config.window);
            return Err(retry_after);
        }

        window.hits.push_back(now);
        Ok(self.config.max_requests - used - 1)
    }

    /// Drop idle windows, then the least recently seen ones if still full.
    fn evict(&self, windows: &mut HashMap<IpAddr, Window>, now: Instant) {
        let window = self.config.window;
        windows.retain(|_, w| {
            w.last_hit()
                .map(|t| now.duration_since(t) < window)
                .unwrap_or(false)
        });

        if windows.len() >= self.config.max_tracked_ips {
            let mut by_age: Vec<_> = windows.iter().map(|(ip, w)| (*ip, w.last_hit())).collect();
            by_age.sort_by_key(|(_, t)| *t);
            let excess = windows.len() + 1 - self.config.max_tracked_ips;
            for (ip, _) in by_age.into_iter().take(excess) {
                windows.remove(&ip);
            }
        }
    }

    pub fn tracked_ips(&self) -> usize {
        self.windows.lock().map(|w| w.len()).unwrap_or(0)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

fn set_limit_headers(headers: &mut HeaderMap, limit: u32, remaining: u32) {
    headers.insert("x-ratelimit-limit", HeaderValue::from(limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(remaining));
}

/// Rate limit middleware for axum.
///
/// Requests without connection info (in-process tests) share one bucket.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    if request.uri().path() == "/health" || !limiter.is_enabled() {
        return next.run(request).await;
    }

    let ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    match limiter.check(ip) {
        Ok(remaining) => {
            let mut response = next.run(request).await;
            set_limit_headers(response.headers_mut(), limiter.max_requests(), remaining);
            response
        }
        Err(retry_after) => {
            tracing::debug!(%ip, "rate limit exceeded");
            let mut response = (
                StatusCode::TOO_MANY_REQUESTS,
                Json(ErrorResponse::rate_limited(retry_after.as_secs())),
            )
                .into_response();
            let headers = response.headers_mut();
            headers.insert(RETRY_AFTER, HeaderValue::from(retry_after.as_secs()));
            set_limit_headers(headers, limiter.max_requests(), 0);
            response
        }
    }
}
