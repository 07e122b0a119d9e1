//! Middleware pipeline behavior: headers, CORS, rate limits, security events, errors.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;

use common::{body_json, get_request, json_request, test_config, TestGateway, BAD_PASSWORD};
use league_gateway::config::Environment;
use league_gateway::observability::SecurityEventType;

#[tokio::test]
async fn test_health_reports_environment() {
    let gateway = TestGateway::development();

    let response = gateway.send(get_request("/health", "10.1.0.1")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "OK");
    assert_eq!(body["environment"], "development");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_security_headers_on_every_response() {
    let gateway = TestGateway::development();

    for uri in ["/health", "/does/not/exist"] {
        let response = gateway.send(get_request(uri, "10.1.0.2")).await;
        let headers = response.headers();
        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert_eq!(headers["x-frame-options"], "SAMEORIGIN");
        assert!(headers.contains_key("content-security-policy"));
        assert!(headers.contains_key("x-request-id"));
    }
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let gateway = TestGateway::development();

    let response = gateway.send(get_request("/api/teams", "10.1.0.3")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Not found");
    assert_eq!(body["message"], "Route GET /api/teams not found");
}

#[tokio::test]
async fn test_cors_preflight_allowed_origin() {
    let gateway = TestGateway::development();

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/auth/signin")
        .header("origin", "http://localhost:5173")
        .header("access-control-request-method", "POST")
        .body(Body::empty())
        .unwrap();
    let response = gateway.send(request).await;

    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], "http://localhost:5173");
    assert_eq!(headers["access-control-allow-credentials"], "true");
}

#[tokio::test]
async fn test_cors_preflight_disallowed_origin() {
    let gateway = TestGateway::development();

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/auth/signin")
        .header("origin", "https://evil.example")
        .header("access-control-request-method", "POST")
        .body(Body::empty())
        .unwrap();
    let response = gateway.send(request).await;

    assert!(!response.headers().contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn test_general_limiter_rejects_after_budget() {
    let mut config = test_config(Environment::Development, "http://127.0.0.1:1");
    config.rate_limit.general.max_requests = 3;
    let gateway = TestGateway::new(config);

    for _ in 0..3 {
        let response = gateway.send(get_request("/health", "10.2.0.1")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("ratelimit-remaining"));
    }

    let response = gateway.send(get_request("/health", "10.2.0.1")).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key("retry-after"));
    let body = body_json(response).await;
    assert_eq!(body["code"], "RATE_LIMITED");

    // A different client still has its own budget.
    let response = gateway.send(get_request("/health", "10.2.0.2")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_disabled_rate_limiting_never_rejects() {
    let mut config = test_config(Environment::Development, "http://127.0.0.1:1");
    config.rate_limit.enabled = false;
    config.rate_limit.general.max_requests = 1;
    let gateway = TestGateway::new(config);

    for _ in 0..5 {
        let response = gateway.send(get_request("/health", "10.2.1.1")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn test_suspicious_url_recorded_once() {
    let gateway = TestGateway::development();

    let response = gateway
        .send(get_request("/search?q=%3Cscript%3Ealert(1)%3C/script%3E", "10.3.0.1"))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let events = gateway
        .state
        .logger
        .events()
        .query(Some(SecurityEventType::SuspiciousRequest), None);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].ip, "10.3.0.1");
    assert_eq!(events[0].method, "GET");
}

#[tokio::test]
async fn test_admin_access_recorded_even_when_upstream_fails() {
    let gateway = TestGateway::development();

    let response = gateway.send(get_request("/api/admin/teams", "10.3.0.2")).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let events = gateway
        .state
        .logger
        .events()
        .query(Some(SecurityEventType::AdminAccessAttempt), None);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].url, "/api/admin/teams");
}

#[tokio::test]
async fn test_sensitive_query_values_are_redacted_in_events() {
    let gateway = TestGateway::development();

    gateway
        .send(get_request("/api/admin/teams?access_token=abc123&season=2024", "10.3.0.3"))
        .await;

    let events = gateway.state.logger.events().snapshot();
    let url = &events[0].url;
    assert!(!url.contains("abc123"));
    assert!(url.contains("season=2024"));
}

#[tokio::test]
async fn test_dev_events_endpoint_filters_and_clears() {
    let gateway = TestGateway::development();

    gateway
        .send(json_request(
            "POST",
            "/api/auth/signin",
            "10.4.0.1",
            json!({ "email": "player@league.org", "password": BAD_PASSWORD }),
        ))
        .await;
    gateway.send(get_request("/api/admin/teams", "10.4.0.1")).await;

    let response = gateway
        .send(get_request("/api/dev/security-events?type=AUTH_FAILURE", "10.4.0.1"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["capacity"], 1000);
    assert_eq!(body["events"][0]["type"], "AUTH_FAILURE");
    assert_eq!(body["events"][0]["statusCode"], 401);

    let response = gateway
        .send(get_request("/api/dev/security-events?type=NOPE", "10.4.0.1"))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let request = Request::builder()
        .method("DELETE")
        .uri("/api/dev/security-events")
        .header("x-forwarded-for", "10.4.0.1")
        .body(Body::empty())
        .unwrap();
    let response = gateway.send(request).await;
    let body = body_json(response).await;
    assert_eq!(body["cleared"], 2);
    assert!(gateway.state.logger.events().is_empty());
}

#[tokio::test]
async fn test_dev_events_endpoint_absent_in_production() {
    let gateway = TestGateway::new(test_config(Environment::Production, "http://127.0.0.1:1"));

    let response = gateway
        .send(get_request("/api/dev/security-events", "10.4.0.2"))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let mut config = test_config(Environment::Development, "http://127.0.0.1:1");
    config.limits.max_body_bytes = 64;
    let gateway = TestGateway::new(config);

    let response = gateway
        .send(json_request(
            "POST",
            "/api/auth/signin",
            "10.5.0.1",
            json!({ "email": "player@league.org", "password": "x".repeat(200) }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Payload too large");
}

#[tokio::test]
async fn test_oversized_passthrough_body_is_json_413() {
    let mut config = test_config(Environment::Development, "http://127.0.0.1:1");
    config.limits.max_body_bytes = 64;
    let gateway = TestGateway::new(config);

    let response = gateway
        .send(json_request(
            "POST",
            "/api/admin/teams",
            "10.5.0.2",
            json!({ "name": "x".repeat(200) }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(response.headers()["content-type"], "application/json");
    let body = body_json(response).await;
    assert_eq!(body["error"], "Payload too large");
}
