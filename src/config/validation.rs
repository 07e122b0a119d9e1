//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (windows > 0, capacity > 0, port valid)
//! - Reject CORS wildcards, which are incompatible with credentialed requests
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use url::Url;

use crate::config::schema::{GatewayConfig, RateLimitTier};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a fully merged configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.port == 0 {
        errors.push(ValidationError::new("server.port", "must be non-zero"));
    }

    if config.cors.origins.is_empty() {
        errors.push(ValidationError::new("cors.origins", "at least one origin is required"));
    }
    for origin in &config.cors.origins {
        if origin.trim() == "*" {
            errors.push(ValidationError::new(
                "cors.origins",
                "wildcard origin cannot be combined with credentials",
            ));
        } else if Url::parse(origin).is_err() {
            errors.push(ValidationError::new(
                "cors.origins",
                format!("'{}' is not a valid origin", origin),
            ));
        }
    }

    match Url::parse(&config.upstream.supabase_url) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError::new(
            "upstream.supabase_url",
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new("upstream.supabase_url", e.to_string())),
    }
    if config.upstream.timeout_secs == 0 {
        errors.push(ValidationError::new("upstream.timeout_secs", "must be greater than 0"));
    }

    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::new("limits.max_body_bytes", "must be greater than 0"));
    }

    check_tier("rate_limit.general", &config.rate_limit.general, &mut errors);
    check_tier("rate_limit.auth", &config.rate_limit.auth, &mut errors);
    check_tier("rate_limit.admin", &config.rate_limit.admin, &mut errors);
    if config.rate_limit.sweep_interval_secs == 0 {
        errors.push(ValidationError::new(
            "rate_limit.sweep_interval_secs",
            "must be greater than 0",
        ));
    }

    if config.request_log.event_capacity == 0 {
        errors.push(ValidationError::new(
            "request_log.event_capacity",
            "must be greater than 0",
        ));
    }
    if !config.request_log.admin_prefix.starts_with('/') {
        errors.push(ValidationError::new(
            "request_log.admin_prefix",
            "must start with '/'",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_tier(name: &str, tier: &RateLimitTier, errors: &mut Vec<ValidationError>) {
    if tier.max_requests == 0 {
        errors.push(ValidationError::new(
            format!("{}.max_requests", name),
            "must be greater than 0",
        ));
    }
    if tier.window_secs == 0 {
        errors.push(ValidationError::new(
            format!("{}.window_secs", name),
            "must be greater than 0",
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = GatewayConfig::default();
        config.cors.origins = vec!["*".to_string()];
        config.rate_limit.auth.max_requests = 0;
        config.request_log.event_capacity = 0;
        config.upstream.supabase_url = "ftp://example.com".to_string();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(errors.len(), 4);
        assert!(fields.contains(&"cors.origins"));
        assert!(fields.contains(&"rate_limit.auth.max_requests"));
        assert!(fields.contains(&"request_log.event_capacity"));
        assert!(fields.contains(&"upstream.supabase_url"));
    }
}
