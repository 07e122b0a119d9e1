//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Root configuration for the league gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener settings and deployment environment.
    pub server: ServerConfig,

    /// Cross-origin policy.
    pub cors: CorsConfig,

    /// Hosted auth/database provider.
    pub upstream: UpstreamConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Per-IP rate limiting tiers.
    pub rate_limit: RateLimitConfig,

    /// Request logger and security event buffer.
    pub request_log: RequestLogConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Deployment environment, taken from `NODE_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl Environment {
    /// Parse an environment name. Returns `None` for unrecognised values.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "production" | "prod" => Some(Self::Production),
            "test" => Some(Self::Test),
            _ => None,
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,

    /// TCP port (`PORT`).
    pub port: u16,

    /// Deployment environment (`NODE_ENV`).
    pub environment: Environment,
}

impl ServerConfig {
    /// `host:port` pair suitable for `TcpListener::bind`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            environment: Environment::Development,
        }
    }
}

/// CORS configuration. Credentials are always allowed, so origins must be explicit.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Allowed origins (`CORS_ORIGIN`, comma separated).
    pub origins: Vec<String>,

    /// Preflight cache lifetime in seconds.
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origins: vec!["http://localhost:5173".to_string()],
            max_age_secs: 600,
        }
    }
}

/// Hosted auth/database provider settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Project base URL (`SUPABASE_URL`).
    pub supabase_url: String,

    /// Public anon key sent as `apikey` (`SUPABASE_ANON_KEY`).
    pub supabase_anon_key: String,

    /// Outbound request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: String::new(),
            timeout_secs: 30,
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum JSON / url-encoded body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// One fixed-window rate limit tier.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RateLimitTier {
    /// Requests allowed per window.
    pub max_requests: u32,

    /// Window length in seconds.
    pub window_secs: u64,

    /// Do not count responses with status < 400 against the budget.
    #[serde(default)]
    pub skip_successful: bool,

    /// Message returned in the 429 body.
    pub message: String,
}

impl RateLimitTier {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Applied to every request.
    pub general: RateLimitTier,

    /// Applied to `/api/auth/*`.
    pub auth: RateLimitTier,

    /// Applied to `/api/admin/*` and `/api/notifications/*`.
    pub admin: RateLimitTier,

    /// Interval of the expired-window sweep in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            general: RateLimitTier {
                max_requests: 100,
                window_secs: 15 * 60,
                skip_successful: false,
                message: "Too many requests from this IP, please try again later.".to_string(),
            },
            auth: RateLimitTier {
                max_requests: 5,
                window_secs: 15 * 60,
                skip_successful: true,
                message: "Too many authentication attempts, please try again later.".to_string(),
            },
            admin: RateLimitTier {
                max_requests: 30,
                window_secs: 60,
                skip_successful: false,
                message: "Too many admin requests, please slow down.".to_string(),
            },
            sweep_interval_secs: 60,
        }
    }
}

/// Request logger configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RequestLogConfig {
    /// Maximum number of buffered security events.
    pub event_capacity: usize,

    /// Responses slower than this are recorded as `SLOW_REQUEST`.
    pub slow_request_ms: u64,

    /// Path prefix of admin routes.
    pub admin_prefix: String,

    /// Path segment identifying auth routes.
    pub auth_segment: String,
}

impl Default for RequestLogConfig {
    fn default() -> Self {
        Self {
            event_capacity: 1000,
            slow_request_ms: 5000,
            admin_prefix: "/api/admin".to_string(),
            auth_segment: "/auth".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Pretty output for humans, JSON for log shippers.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
