//! Pass-through forwarding to the hosted database and notification functions.
//!
//! `/api/admin/<path>` maps to `<SUPABASE_URL>/rest/v1/<path>` and
//! `/api/notifications/<path>` to `<SUPABASE_URL>/functions/v1/notifications/<path>`.
//! Method, query string, body and a fixed set of headers are forwarded; the
//! provider's status, body and content headers are relayed back unchanged.

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method};
use axum::response::Response;
use reqwest::Client;
use url::Url;

use crate::config::UpstreamConfig;

const APIKEY: HeaderName = HeaderName::from_static("apikey");

/// Request headers copied to the provider.
const FORWARDED_REQUEST_HEADERS: &[&str] = &[
    "authorization",
    "content-type",
    "accept",
    "range",
    "prefer",
    "accept-profile",
    "content-profile",
];

/// Response headers copied back to the client.
const FORWARDED_RESPONSE_HEADERS: &[&str] = &[
    "content-type",
    "content-range",
    "location",
    "preference-applied",
];

/// `.` or `..`, including any `%2e` spelling of the dots.
fn is_dot_segment(segment: &str) -> bool {
    let dots = segment.to_ascii_lowercase().replace("%2e", ".");
    dots == "." || dots == ".."
}

/// Which provider API a pass-through route targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Rest,
    Notifications,
}

impl Target {
    fn prefix(&self) -> &'static str {
        match self {
            Target::Rest => "rest/v1",
            Target::Notifications => "functions/v1/notifications",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("invalid upstream path '{0}'")]
    InvalidPath(String),

    #[error("invalid upstream base url: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),

    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Forwards pass-through requests to the provider.
#[derive(Debug, Clone)]
pub struct RestProxy {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl RestProxy {
    pub fn new(config: &UpstreamConfig, client: Client) -> Self {
        Self {
            client,
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
        }
    }

    /// Full provider URL for a captured route path.
    ///
    /// Each segment is pushed through `Url::path_segments_mut`, which
    /// percent-encodes it again, so an encoded dot-segment stays literal.
    pub fn url_for(&self, target: Target, path: &str, query: Option<&str>) -> Result<String, UpstreamError> {
        let path = path.trim_start_matches('/');
        if path.is_empty() || path.split('/').any(is_dot_segment) {
            return Err(UpstreamError::InvalidPath(path.to_string()));
        }

        let mut url = Url::parse(&self.base_url)?;
        let scope = format!("{}/{}/", url.path().trim_end_matches('/'), target.prefix());
        url.path_segments_mut()
            .map_err(|_| UpstreamError::InvalidPath(path.to_string()))?
            .pop_if_empty()
            .extend(target.prefix().split('/'))
            .extend(path.split('/'));

        if !url.path().starts_with(&scope) {
            return Err(UpstreamError::InvalidPath(path.to_string()));
        }

        url.set_query(query.filter(|q| !q.is_empty()));
        Ok(url.into())
    }

    pub async fn forward(
        &self,
        target: Target,
        method: Method,
        path: &str,
        query: Option<&str>,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Result<Response, UpstreamError> {
        let url = self.url_for(target, path, query)?;

        let mut outbound = HeaderMap::new();
        for name in FORWARDED_REQUEST_HEADERS {
            if let Some(value) = headers.get(*name) {
                outbound.insert(HeaderName::from_static(*name), value.clone());
            }
        }
        if !outbound.contains_key(header::AUTHORIZATION) {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", self.anon_key)) {
                outbound.insert(header::AUTHORIZATION, value);
            }
        }
        if let Ok(value) = HeaderValue::from_str(&self.anon_key) {
            outbound.insert(APIKEY, value);
        }

        tracing::debug!(method = %method, url = %url, "Forwarding pass-through request");

        let upstream = self
            .client
            .request(method, &url)
            .headers(outbound)
            .body(body)
            .send()
            .await?;

        let status = upstream.status();
        let upstream_headers = upstream.headers().clone();
        let bytes = upstream.bytes().await?;

        let mut response = Response::new(Body::from(bytes));
        *response.status_mut() = status;
        for name in FORWARDED_RESPONSE_HEADERS {
            if let Some(value) = upstream_headers.get(*name) {
                response.headers_mut().insert(HeaderName::from_static(*name), value.clone());
            }
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proxy() -> RestProxy {
        let config = UpstreamConfig {
            supabase_url: "https://abc.supabase.co/".to_string(),
            supabase_anon_key: "anon".to_string(),
            timeout_secs: 5,
        };
        RestProxy::new(&config, Client::new())
    }

    #[test]
    fn test_url_mapping() {
        let proxy = proxy();
        assert_eq!(
            proxy.url_for(Target::Rest, "teams", Some("select=*&order=name")).unwrap(),
            "https://abc.supabase.co/rest/v1/teams?select=*&order=name"
        );
        assert_eq!(
            proxy.url_for(Target::Notifications, "send", None).unwrap(),
            "https://abc.supabase.co/functions/v1/notifications/send"
        );
    }

    #[test]
    fn test_rejects_traversal() {
        let proxy = proxy();
        assert!(proxy.url_for(Target::Rest, "../auth/v1/admin/users", None).is_err());
        assert!(proxy.url_for(Target::Rest, "", None).is_err());
        assert!(proxy.url_for(Target::Rest, "%2e%2e/auth/v1/admin/users", None).is_err());
        assert!(proxy.url_for(Target::Rest, "teams/%2E", None).is_err());
    }

    #[test]
    fn test_encoded_segments_stay_inside_scope() {
        let proxy = proxy();
        let url = proxy
            .url_for(Target::Rest, "%252e%252e/auth", None)
            .unwrap();
        assert_eq!(url, "https://abc.supabase.co/rest/v1/%25252e%25252e/auth");

        let url = proxy.url_for(Target::Rest, "a%2fb/c", None).unwrap();
        assert!(url.starts_with("https://abc.supabase.co/rest/v1/"));
    }

    #[test]
    fn test_base_url_with_path() {
        let config = UpstreamConfig {
            supabase_url: "http://localhost:54321/project/".to_string(),
            supabase_anon_key: "anon".to_string(),
            timeout_secs: 5,
        };
        let proxy = RestProxy::new(&config, Client::new());
        assert_eq!(
            proxy.url_for(Target::Rest, "teams", None).unwrap(),
            "http://localhost:54321/project/rest/v1/teams"
        );
    }
}
