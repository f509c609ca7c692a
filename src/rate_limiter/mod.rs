/*!
 * # Rate Limiting Module
 *
 * Fixed-window rate limiter for API requests, keyed by client IP.
 * The in-memory backend covers a single process; the Redis backend
 * makes the same limits hold across multiple API instances.
 *
 * Standard `X-RateLimit-*` headers are attached to responses when
 * enabled, and over-limit requests receive 429 with a `Retry-After`.
 */

use axum::{
    extract::{Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;
use redis::AsyncCommands;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::errors::ErrorResponse;

/// Numeric strings are always valid header values.
fn num_to_header_value<T: ToString>(n: T) -> HeaderValue {
    HeaderValue::from_str(&n.to_string()).unwrap_or_else(|_| HeaderValue::from_static("0"))
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub requests_per_window: u32,
    pub window_duration: Duration,
    pub enable_headers: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_window: 100,
            window_duration: Duration::from_secs(900),
            enable_headers: true,
        }
    }
}

#[derive(Debug, Clone)]
struct WindowEntry {
    count: u32,
    window_start: Instant,
}

impl WindowEntry {
    fn new() -> Self {
        Self {
            count: 1,
            window_start: Instant::now(),
        }
    }

    fn tick(&mut self, window: Duration) -> u32 {
        let now = Instant::now();
        if now.duration_since(self.window_start) >= window {
            self.count = 1;
            self.window_start = now;
        } else {
            self.count += 1;
        }
        self.count
    }

    fn seconds_until_reset(&self, window: Duration) -> u64 {
        let elapsed = Instant::now().duration_since(self.window_start);
        window.saturating_sub(elapsed).as_secs().max(1)
    }
}

/// Outcome of one admission check.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_secs: u64,
}

/// Storage backend for window counters.
enum RateLimitBackend {
    InMemory(DashMap<String, WindowEntry>),
    Redis {
        client: Arc<redis::Client>,
        namespace: String,
    },
}

pub struct RateLimiter {
    config: RateLimitConfig,
    backend: RateLimitBackend,
}

impl RateLimiter {
    fn new(config: RateLimitConfig, backend: RateLimitBackend) -> Self {
        Self { config, backend }
    }

    pub fn in_memory(config: RateLimitConfig) -> Self {
        Self::new(config, RateLimitBackend::InMemory(DashMap::new()))
    }

    pub fn redis(
        config: RateLimitConfig,
        client: Arc<redis::Client>,
        namespace: impl Into<String>,
    ) -> Self {
        Self::new(
            config,
            RateLimitBackend::Redis {
                client,
                namespace: namespace.into(),
            },
        )
    }

    pub fn enable_headers(&self) -> bool {
        self.config.enable_headers
    }

    /// Record one request for `key` and decide whether it is admitted.
    pub async fn check(&self, key: &str) -> RateLimitDecision {
        let limit = self.config.requests_per_window;
        let window = self.config.window_duration;

        match &self.backend {
            RateLimitBackend::InMemory(entries) => {
                // A fresh entry already counts this request; an existing
                // one is ticked inside the map guard.
                let mut count = 1u32;
                let entry = entries
                    .entry(key.to_string())
                    .and_modify(|e| count = e.tick(window))
                    .or_insert_with(WindowEntry::new);
                let reset_secs = entry.seconds_until_reset(window);
                drop(entry);

                RateLimitDecision {
                    allowed: count <= limit,
                    limit,
                    remaining: limit.saturating_sub(count),
                    reset_secs,
                }
            }
            RateLimitBackend::Redis { client, namespace } => {
                match self.check_redis(client, namespace, key).await {
                    Ok(decision) => decision,
                    Err(e) => {
                        // Availability beats strictness for traffic shaping;
                        // a Redis outage must not take the API down with it.
                        warn!("Rate limiter Redis error (admitting request): {}", e);
                        RateLimitDecision {
                            allowed: true,
                            limit,
                            remaining: limit,
                            reset_secs: window.as_secs(),
                        }
                    }
                }
            }
        }
    }

    async fn check_redis(
        &self,
        client: &redis::Client,
        namespace: &str,
        key: &str,
    ) -> Result<RateLimitDecision, redis::RedisError> {
        let limit = self.config.requests_per_window;
        let window_secs = self.config.window_duration.as_secs() as usize;
        let redis_key = format!("{}:{}", namespace, key);

        let mut conn = client.get_async_connection().await?;
        let count: u32 = conn.incr(&redis_key, 1u32).await?;
        if count == 1 {
            let _: () = conn.expire(&redis_key, window_secs).await?;
        }
        let ttl: i64 = conn.ttl(&redis_key).await?;

        Ok(RateLimitDecision {
            allowed: count <= limit,
            limit,
            remaining: limit.saturating_sub(count),
            reset_secs: ttl.max(1) as u64,
        })
    }
}

/// Middleware applying the limiter to every request.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let key = client_key(&request);
    let decision = limiter.check(&key).await;

    if !decision.allowed {
        debug!(%key, "rate limit exceeded");
        let body = ErrorResponse {
            error: "Too Many Requests".to_string(),
            message: "Rate limit exceeded, please try again later".to_string(),
            details: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
        let headers = response.headers_mut();
        headers.insert("retry-after", num_to_header_value(decision.reset_secs));
        if limiter.enable_headers() {
            headers.insert("x-ratelimit-limit", num_to_header_value(decision.limit));
            headers.insert("x-ratelimit-remaining", num_to_header_value(0u32));
            headers.insert("x-ratelimit-reset", num_to_header_value(decision.reset_secs));
        }
        return response;
    }

    let mut response = next.run(request).await;
    if limiter.enable_headers() {
        let headers = response.headers_mut();
        headers.insert("x-ratelimit-limit", num_to_header_value(decision.limit));
        headers.insert(
            "x-ratelimit-remaining",
            num_to_header_value(decision.remaining),
        );
        headers.insert("x-ratelimit-reset", num_to_header_value(decision.reset_secs));
    }
    response
}

/// Client identity for limiting: first hop of `x-forwarded-for`, then
/// `x-real-ip`, then a shared bucket.
fn client_key(request: &Request) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    if let Some(real_ip) = request
        .headers()
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
    {
        return real_ip.trim().to_string();
    }

    "unknown".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, routing::get, Router};
    use tower::ServiceExt;

    fn limiter(limit: u32) -> Arc<RateLimiter> {
        Arc::new(RateLimiter::in_memory(RateLimitConfig {
            requests_per_window: limit,
            window_duration: Duration::from_secs(60),
            enable_headers: true,
        }))
    }

    #[tokio::test]
    async fn admits_up_to_limit_then_rejects() {
        let limiter = limiter(3);

        for _ in 0..3 {
            assert!(limiter.check("1.2.3.4").await.allowed);
        }
        let decision = limiter.check("1.2.3.4").await;
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let limiter = limiter(1);

        assert!(limiter.check("1.1.1.1").await.allowed);
        assert!(!limiter.check("1.1.1.1").await.allowed);
        assert!(limiter.check("2.2.2.2").await.allowed);
    }

    #[tokio::test]
    async fn middleware_sets_headers_and_429() {
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn_with_state(
                limiter(1),
                rate_limit_middleware,
            ));

        let ok = app
            .clone()
            .oneshot(
                axum::http::Request::builder()
                    .uri("/")
                    .header("x-forwarded-for", "9.9.9.9")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::OK);
        assert_eq!(ok.headers().get("x-ratelimit-limit").unwrap(), "1");

        let rejected = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/")
                    .header("x-forwarded-for", "9.9.9.9")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(rejected.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(rejected.headers().contains_key("retry-after"));
    }
}
