//! Request logger middleware.
//!
//! # Responsibilities
//! - Capture method, URL, client IP, user agent and start time of every request
//! - After the response is produced, log it and classify it into security events
//! - Buffer events in the shared `SecurityEventLog`
//!
//! # Design Decisions
//! - Never fails: a missing header or undecodable URL simply matches nothing
//! - Pattern checks run on the percent-decoded URL; the stored URL is redacted
//! - `SUSPICIOUS_REQUEST` and `ADMIN_ACCESS_ATTEMPT` are recorded before the
//!   handler runs, so they are kept even when a later layer rejects the request

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    http::header::USER_AGENT,
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use crate::config::{Environment, RequestLogConfig};
use crate::http::request::client_ip;
use crate::observability::metrics;
use crate::observability::security_log::{SecurityEvent, SecurityEventLog, SecurityEventType};

/// Case-insensitive substrings that mark a URL as an injection attempt.
const SUSPICIOUS_PATTERNS: &[&str] = &["<script>", "javascript:", "onload="];

/// Query parameters whose values are never stored or logged.
const SENSITIVE_PARAMS: &[&str] = &[
    "token",
    "access_token",
    "refresh_token",
    "password",
    "apikey",
    "api_key",
    "key",
    "secret",
];

const REDACTED: &str = "[REDACTED]";

/// Shared state of the request logger.
#[derive(Debug, Clone)]
pub struct RequestLogger {
    events: Arc<SecurityEventLog>,
    config: Arc<RequestLogConfig>,
    environment: Environment,
}

/// What the logger knows about a request before the handler runs.
struct RequestInfo {
    method: String,
    raw_url: String,
    url: String,
    path: String,
    ip: String,
    user_agent: String,
}

impl RequestLogger {
    pub fn new(config: RequestLogConfig, environment: Environment) -> Self {
        let events = Arc::new(SecurityEventLog::new(config.event_capacity));
        Self::with_events(config, environment, events)
    }

    /// Build a logger around an existing buffer.
    pub fn with_events(
        config: RequestLogConfig,
        environment: Environment,
        events: Arc<SecurityEventLog>,
    ) -> Self {
        Self {
            events,
            config: Arc::new(config),
            environment,
        }
    }

    pub fn events(&self) -> &Arc<SecurityEventLog> {
        &self.events
    }

    /// Event types detectable from the request alone.
    pub fn classify_request(&self, url: &str, path: &str) -> Vec<SecurityEventType> {
        let mut types = Vec::new();
        if is_suspicious(url) {
            types.push(SecurityEventType::SuspiciousRequest);
        }
        if path.starts_with(&self.config.admin_prefix) {
            types.push(SecurityEventType::AdminAccessAttempt);
        }
        types
    }

    /// Event types that depend on the response.
    pub fn classify_response(&self, path: &str, status: u16, elapsed: Duration) -> Vec<SecurityEventType> {
        let mut types = Vec::new();
        if path.contains(&self.config.auth_segment) && status >= 400 {
            types.push(SecurityEventType::AuthFailure);
        }
        if elapsed.as_millis() > u128::from(self.config.slow_request_ms) {
            types.push(SecurityEventType::SlowRequest);
        }
        types
    }

    fn record(&self, event: SecurityEvent) {
        metrics::record_security_event(event.event_type.as_str());

        if self.environment.is_development() {
            tracing::warn!(
                event_type = %event.event_type,
                method = %event.method,
                url = %event.url,
                ip = %event.ip,
                status = ?event.status_code,
                duration_ms = ?event.duration,
                "Security event"
            );
        } else {
            tracing::debug!(
                event_type = %event.event_type,
                url = %event.url,
                ip = %event.ip,
                "Security event"
            );
        }

        self.events.record(event);
    }

    fn event(
        info: &RequestInfo,
        event_type: SecurityEventType,
        timestamp: chrono::DateTime<Utc>,
        status_code: Option<u16>,
        duration: Option<u64>,
    ) -> SecurityEvent {
        SecurityEvent {
            event_type,
            timestamp,
            method: info.method.clone(),
            url: info.url.clone(),
            ip: info.ip.clone(),
            user_agent: info.user_agent.clone(),
            status_code,
            duration,
        }
    }
}

/// Middleware wrapping every request/response pair.
pub async fn request_logger_middleware(
    State(logger): State<RequestLogger>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let timestamp = Utc::now();

    let raw_url = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let info = RequestInfo {
        method: request.method().to_string(),
        url: redact_url(&raw_url),
        path: request.uri().path().to_string(),
        ip: client_ip(&request),
        user_agent: request
            .headers()
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string(),
        raw_url,
    };

    for event_type in logger.classify_request(&info.raw_url, &info.path) {
        logger.record(RequestLogger::event(&info, event_type, timestamp, None, None));
    }

    let response = next.run(request).await;

    let elapsed = start.elapsed();
    let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
    let status = response.status().as_u16();

    tracing::info!(
        method = %info.method,
        url = %info.url,
        status = status,
        duration_ms = duration_ms,
        ip = %info.ip,
        "Request completed"
    );
    metrics::record_request(&info.method, status, elapsed);

    for event_type in logger.classify_response(&info.path, status, elapsed) {
        logger.record(RequestLogger::event(
            &info,
            event_type,
            timestamp,
            Some(status),
            Some(duration_ms),
        ));
    }

    response
}

/// True if the raw or percent-decoded URL contains an attack signature.
pub fn is_suspicious(url: &str) -> bool {
    let raw = url.to_lowercase();
    let decoded = String::from_utf8_lossy(&urlencoding::decode_binary(url.as_bytes())).to_lowercase();
    SUSPICIOUS_PATTERNS
        .iter()
        .any(|pattern| raw.contains(pattern) || decoded.contains(pattern))
}

/// Replace the values of sensitive query parameters with `[REDACTED]`.
pub fn redact_url(url: &str) -> String {
    let Some((path, query)) = url.split_once('?') else {
        return url.to_string();
    };

    let redacted: Vec<String> = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((name, _)) if is_sensitive_param(name) => format!("{}={}", name, REDACTED),
            _ => pair.to_string(),
        })
        .collect();

    format!("{}?{}", path, redacted.join("&"))
}

fn is_sensitive_param(name: &str) -> bool {
    let decoded = urlencoding::decode(name)
        .map(|n| n.to_lowercase())
        .unwrap_or_else(|_| name.to_lowercase());
    SENSITIVE_PARAMS.contains(&decoded.as_str())
}
