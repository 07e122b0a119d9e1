//! Security response headers.
//!
//! # Responsibilities
//! - Attach a fixed content-security-policy to every response
//! - Add frame, sniffing, referrer, transport and cross-origin isolation headers
//!
//! # Design Decisions
//! - Header set is computed once at startup
//! - Headers a handler already set are left alone

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

use crate::config::GatewayConfig;

const BASE_CSP: &str = "default-src 'self'; \
    script-src 'self'; \
    style-src 'self' 'unsafe-inline'; \
    img-src 'self' data: https:; \
    font-src 'self' https: data:; \
    object-src 'none'; \
    frame-ancestors 'self'; \
    base-uri 'self'; \
    form-action 'self'";

/// Precomputed security header set.
#[derive(Debug, Clone)]
pub struct SecurityHeaders {
    headers: HeaderMap,
}

impl SecurityHeaders {
    pub fn from_config(config: &GatewayConfig) -> Self {
        let mut headers = HeaderMap::new();

        let csp = content_security_policy(&config.upstream.supabase_url);
        let csp = HeaderValue::from_str(&csp).unwrap_or_else(|_| {
            tracing::warn!("Upstream URL is not header-safe; CSP connect-src limited to 'self'");
            HeaderValue::from_str(&content_security_policy("")).unwrap_or(HeaderValue::from_static(BASE_CSP))
        });
        headers.insert(HeaderName::from_static("content-security-policy"), csp);

        for (name, value) in [
            ("x-frame-options", "SAMEORIGIN"),
            ("x-content-type-options", "nosniff"),
            ("referrer-policy", "no-referrer"),
            ("strict-transport-security", "max-age=15552000; includeSubDomains"),
            ("x-dns-prefetch-control", "off"),
            ("x-download-options", "noopen"),
            ("x-permitted-cross-domain-policies", "none"),
            ("cross-origin-opener-policy", "same-origin"),
            ("cross-origin-resource-policy", "same-origin"),
            ("origin-agent-cluster", "?1"),
            ("x-xss-protection", "0"),
        ] {
            headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
        }

        Self { headers }
    }

    fn apply(&self, target: &mut HeaderMap) {
        for (name, value) in &self.headers {
            if !target.contains_key(name) {
                target.insert(name.clone(), value.clone());
            }
        }
    }
}

/// CSP with the upstream origin allowed for `connect-src`.
pub fn content_security_policy(upstream_url: &str) -> String {
    let upstream = upstream_url.trim().trim_end_matches('/');
    if upstream.is_empty() {
        format!("{}; connect-src 'self'", BASE_CSP)
    } else {
        format!("{}; connect-src 'self' {}", BASE_CSP, upstream)
    }
}

pub async fn security_headers_middleware(
    State(headers): State<Arc<SecurityHeaders>>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    headers.apply(response.headers_mut());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csp_allows_upstream() {
        let csp = content_security_policy("https://abc.supabase.co/");
        assert!(csp.starts_with("default-src 'self'"));
        assert!(csp.ends_with("connect-src 'self' https://abc.supabase.co"));
    }

    #[test]
    fn test_does_not_override_existing_headers() {
        let security = SecurityHeaders::from_config(&GatewayConfig::default());
        let mut target = HeaderMap::new();
        target.insert("x-frame-options", HeaderValue::from_static("DENY"));
        security.apply(&mut target);

        assert_eq!(target["x-frame-options"], "DENY");
        assert_eq!(target["x-content-type-options"], "nosniff");
        assert!(target.contains_key("content-security-policy"));
    }
}
