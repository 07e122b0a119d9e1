//! Admin and notification pass-throughs, plus the development-only event view.

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, Path, Query, State},
    http::{header::CONTENT_TYPE, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::observability::{SecurityEvent, SecurityEventType};
use crate::security::validation::{bytes_rejection, sanitize_json_strings};
use crate::upstream::{Target, UpstreamError};

pub async fn admin_proxy(
    State(state): State<AppState>,
    method: Method,
    Path(path): Path<String>,
    uri: Uri,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let body = body.map_err(bytes_rejection)?;
    let body = if is_write(&method) && is_json(&headers) {
        sanitize_body(body)?
    } else {
        body
    };
    forward(&state, Target::Rest, method, &path, &uri, &headers, body).await
}

pub async fn notifications_proxy(
    State(state): State<AppState>,
    method: Method,
    Path(path): Path<String>,
    uri: Uri,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let body = body.map_err(bytes_rejection)?;
    forward(&state, Target::Notifications, method, &path, &uri, &headers, body).await
}

async fn forward(
    state: &AppState,
    target: Target,
    method: Method,
    path: &str,
    uri: &Uri,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    state
        .rest
        .forward(target, method, path, uri.query(), headers, body)
        .await
        .map_err(|e| match e {
            UpstreamError::InvalidPath(_) => {
                ApiError::new(StatusCode::BAD_REQUEST, "Invalid path", e.to_string())
            }
            UpstreamError::InvalidBaseUrl(ref err) => {
                tracing::error!(error = %err, "Upstream base URL does not parse");
                ApiError::internal()
            }
            UpstreamError::Transport(ref err) => {
                tracing::error!(error = %err, path = %path, "Pass-through request failed");
                ApiError::bad_gateway("The data service is unavailable")
            }
        })
}

fn is_write(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"))
}

fn sanitize_body(body: Bytes) -> Result<Bytes, ApiError> {
    if body.is_empty() {
        return Ok(body);
    }
    let mut document: serde_json::Value = serde_json::from_slice(&body).map_err(|e| {
        ApiError::new(StatusCode::BAD_REQUEST, "Invalid request body", e.to_string())
    })?;
    sanitize_json_strings(&mut document);
    serde_json::to_vec(&document)
        .map(Bytes::from)
        .map_err(|_| ApiError::internal())
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub count: usize,
    pub capacity: usize,
    pub events: Vec<SecurityEvent>,
}

/// `GET /api/dev/security-events`
pub async fn list_security_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<EventsResponse>, ApiError> {
    let event_type = match query.event_type.as_deref() {
        Some(raw) => Some(SecurityEventType::parse(raw).ok_or_else(|| {
            ApiError::new(
                StatusCode::BAD_REQUEST,
                "Invalid event type",
                format!("Unknown security event type '{}'", raw),
            )
        })?),
        None => None,
    };

    let log = state.logger.events();
    let events = log.query(event_type, query.limit);
    Ok(Json(EventsResponse {
        count: events.len(),
        capacity: log.capacity(),
        events,
    }))
}

/// `DELETE /api/dev/security-events`
pub async fn clear_security_events(State(state): State<AppState>) -> impl IntoResponse {
    let cleared = state.logger.events().clear();
    tracing::info!(cleared = cleared, "Security events cleared");
    Json(serde_json::json!({ "cleared": cleared }))
}
