//! Client-facing error responses.
//!
//! # Responsibilities
//! - Give every failure the same JSON shape: `{error, message?, code?, details?}`
//! - Keep upstream/internal detail out of bodies; it is logged server-side instead
//!
//! # Design Decisions
//! - 429 bodies carry a machine-readable `code`
//! - 400 validation bodies carry field-level `details`

use std::any::Any;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::security::validation::FieldError;

/// Machine-readable code of rate-limit rejections.
pub const RATE_LIMITED: &str = "RATE_LIMITED";

/// Serialized error body.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

/// An error that short-circuits a request.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: error.into(),
                message: Some(message.into()),
                code: None,
                details: None,
            },
        }
    }

    /// 400 with field-level validation errors.
    pub fn validation(details: Vec<FieldError>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorBody {
                error: "Validation failed".to_string(),
                message: None,
                code: None,
                details: Some(details),
            },
        }
    }

    /// 429 with the tier's message.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::TOO_MANY_REQUESTS,
            body: ErrorBody {
                error: message.into(),
                message: None,
                code: Some(RATE_LIMITED),
                details: None,
            },
        }
    }

    pub fn not_found(method: &str, path: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "Not found",
            format!("Route {} {} not found", method, path),
        )
    }

    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
            "Something went wrong",
        )
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, "Upstream request failed", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// `CatchPanicLayer` hook: log the panic and answer with a generic 500.
pub fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    tracing::error!(panic = %detail, "Request handler panicked");
    ApiError::internal().into_response()
}
