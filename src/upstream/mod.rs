//! Hosted backend-as-a-service integration.
//!
//! # Data Flow
//! ```text
//! /api/auth/*          → auth.rs (AuthProvider → GoTrue REST)
//! /api/admin/*         → rest.rs (PostgREST pass-through)
//! /api/notifications/* → rest.rs (edge function pass-through)
//! ```
//!
//! # Design Decisions
//! - One pooled `reqwest::Client` shared by every upstream call
//! - Explicit request timeout; no retries

use std::time::Duration;

use reqwest::Client;

use crate::config::UpstreamConfig;

pub mod auth;
pub mod rest;

pub use auth::{AuthError, AuthProvider, AuthUser, Session, SignUpOutcome, SupabaseAuth};
pub use rest::{RestProxy, Target, UpstreamError};

/// Build the shared outbound HTTP client.
pub fn http_client(config: &UpstreamConfig) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(concat!("league-gateway/", env!("CARGO_PKG_VERSION")))
        .build()
}
