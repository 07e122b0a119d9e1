//! Route handlers.

pub mod admin;
pub mod auth;
pub mod health;

use axum::http::{Method, Uri};

use crate::http::response::ApiError;

/// Fallback for unmatched routes.
pub async fn not_found(method: Method, uri: Uri) -> ApiError {
    ApiError::not_found(method.as_str(), uri.path())
}
