//! Token-bucket rate limiting middleware.
//!
//! Requests are keyed by the authenticated caller when one is attached to the
//! request, otherwise by client IP.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;

use crate::config::RateLimitRule;
use crate::observability::metrics;
use crate::security::auth::Caller;

/// Buckets idle this long are dropped once the map grows past `PRUNE_THRESHOLD`.
const IDLE_EVICTION: Duration = Duration::from_secs(300);
const PRUNE_THRESHOLD: usize = 10_000;

/// A simple token bucket rate limiter.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_update: Instant::now(),
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();

        // Refill tokens
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Per-key buckets for one route.
#[derive(Debug)]
pub struct RateLimiterState {
    buckets: DashMap<String, TokenBucket>,
    route: &'static str,
    rps: f64,
    burst: f64,
}

impl RateLimiterState {
    pub fn new(route: &'static str, rule: &RateLimitRule) -> Self {
        Self {
            buckets: DashMap::new(),
            route,
            rps: f64::from(rule.requests_per_second),
            burst: f64::from(rule.burst_size),
        }
    }

    /// Take one token for `key`. Returns false when the bucket is empty.
    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> bool {
        if self.buckets.len() > PRUNE_THRESHOLD {
            self.buckets
                .retain(|_, b| now.saturating_duration_since(b.last_update) < IDLE_EVICTION);
        }
        let mut bucket = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(self.burst));
        bucket.try_acquire(self.burst, self.rps, now)
    }

    pub fn tracked_keys(&self) -> usize {
        self.buckets.len()
    }
}

/// Middleware function for rate limiting.
pub async fn rate_limit_middleware(
    State(state): State<Arc<RateLimiterState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = if let Some(caller) = request.extensions().get::<Caller>() {
        format!("caller:{}", caller.id)
    } else if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        format!("ip:{}", addr.ip())
    } else {
        "ip:unknown".to_string()
    };

    if state.check(&key) {
        next.run(request).await
    } else {
        tracing::warn!(client = %key, route = state.route, "Rate limit exceeded");
        metrics::record_rate_limited(state.route);
        (StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded").into_response()
    }
}
