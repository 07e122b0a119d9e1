//! Fixed-window rate limiting keyed by client IP.
//!
//! Three independent limiters share one implementation:
//! - `general`: every request
//! - `auth`: authentication routes, successful responses refunded
//! - `admin`: admin and notification pass-throughs
//!
//! Rejection is immediate (429, no queueing). Counters live in memory and
//! reset on restart.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;

use crate::config::{RateLimitConfig, RateLimitTier};
use crate::http::request::client_ip;
use crate::http::response::ApiError;
use crate::observability::metrics;

const RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
const RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
const RATELIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");
const RETRY_AFTER: HeaderName = HeaderName::from_static("retry-after");

/// Counter for one key inside the current window.
#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    started: Instant,
}

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Time until the current window resets.
    pub reset_after: Duration,
    window_started: Instant,
}

impl RateDecision {
    fn reset_secs(&self) -> u64 {
        let secs = self.reset_after.as_secs();
        if self.reset_after.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        }
    }

    fn apply_headers(&self, headers: &mut HeaderMap) {
        // The innermost (most specific) limiter wins.
        if headers.contains_key(&RATELIMIT_LIMIT) {
            return;
        }
        headers.insert(RATELIMIT_LIMIT, HeaderValue::from(self.limit));
        headers.insert(RATELIMIT_REMAINING, HeaderValue::from(self.remaining));
        headers.insert(RATELIMIT_RESET, HeaderValue::from(self.reset_secs()));
    }
}

/// A fixed-window request counter per client key.
#[derive(Debug)]
pub struct RateLimiter {
    name: &'static str,
    limit: u32,
    window: Duration,
    skip_successful: bool,
    message: String,
    windows: DashMap<String, Window>,
}

impl RateLimiter {
    pub fn new(name: &'static str, tier: &RateLimitTier) -> Self {
        Self {
            name,
            limit: tier.max_requests,
            window: tier.window(),
            skip_successful: tier.skip_successful,
            message: tier.message.clone(),
            windows: DashMap::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Count one request for `key` against the current window.
    pub fn check(&self, key: &str) -> RateDecision {
        self.check_at(key, Instant::now())
    }

    pub fn check_at(&self, key: &str, now: Instant) -> RateDecision {
        let mut entry = self.windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            started: now,
        });

        if now.saturating_duration_since(entry.started) >= self.window {
            entry.count = 0;
            entry.started = now;
        }

        let reset_after = self
            .window
            .saturating_sub(now.saturating_duration_since(entry.started));

        let allowed = entry.count < self.limit;
        if allowed {
            entry.count += 1;
        }

        RateDecision {
            allowed,
            limit: self.limit,
            remaining: self.limit.saturating_sub(entry.count),
            reset_after,
            window_started: entry.started,
        }
    }

    /// Give back a request counted by `decision`, unless its window has since rolled over.
    pub fn refund(&self, key: &str, decision: &RateDecision) -> Option<u32> {
        let mut entry = self.windows.get_mut(key)?;
        if entry.started != decision.window_started {
            return None;
        }
        entry.count = entry.count.saturating_sub(1);
        Some(self.limit.saturating_sub(entry.count))
    }

    /// Budget left for `key` in the window current at `now`.
    pub fn remaining_at(&self, key: &str, now: Instant) -> u32 {
        match self.windows.get(key) {
            Some(w) if now.saturating_duration_since(w.started) < self.window => {
                self.limit.saturating_sub(w.count)
            }
            _ => self.limit,
        }
    }

    /// Drop counters whose window has ended. Returns how many were removed.
    pub fn purge_expired(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.started) < self.window);
        before.saturating_sub(self.windows.len())
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }

    fn rejection(&self, decision: &RateDecision) -> Response {
        let mut response = ApiError::rate_limited(self.message.clone()).into_response();
        decision.apply_headers(response.headers_mut());
        response
            .headers_mut()
            .insert(RETRY_AFTER, HeaderValue::from(decision.reset_secs()));
        response
    }
}

/// The three limiter tiers of the gateway.
#[derive(Debug, Clone)]
pub struct RateLimiters {
    pub general: Arc<RateLimiter>,
    pub auth: Arc<RateLimiter>,
    pub admin: Arc<RateLimiter>,
}

impl RateLimiters {
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self {
            general: Arc::new(RateLimiter::new("general", &config.general)),
            auth: Arc::new(RateLimiter::new("auth", &config.auth)),
            admin: Arc::new(RateLimiter::new("admin", &config.admin)),
        }
    }

    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        self.general.purge_expired(now) + self.auth.purge_expired(now) + self.admin.purge_expired(now)
    }
}

/// Middleware enforcing one limiter tier.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let key = client_ip(&request);
    let mut decision = limiter.check(&key);

    if !decision.allowed {
        tracing::warn!(client = %key, tier = limiter.name(), "Rate limit exceeded");
        metrics::record_rate_limited(limiter.name());
        return limiter.rejection(&decision);
    }

    let mut response = next.run(request).await;

    if limiter.skip_successful && response.status().as_u16() < 400 {
        if let Some(remaining) = limiter.refund(&key, &decision) {
            decision.remaining = remaining;
        }
    }

    decision.apply_headers(response.headers_mut());
    response
}
