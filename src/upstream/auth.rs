//! External auth provider adapter.
//!
//! # Responsibilities
//! - `AuthProvider` seam between route handlers and the hosted auth service
//! - `SupabaseAuth`: GoTrue REST implementation (password grant, signup, refresh)
//! - Map provider responses to `Session` / `AuthUser` and provider errors to `AuthError`
//!
//! # Design Decisions
//! - Any 4xx from the provider is a rejection carrying the provider's message
//! - Transport failures and 5xx are unexpected; handlers turn them into 500s
//! - No retries: a failed call is surfaced immediately

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::UpstreamConfig;

/// A user record as returned by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Every other provider field (metadata, timestamps, identities, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Tokens issued by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    pub refresh_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<AuthUser>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Result of a registration. A session is only issued when email confirmation is off.
#[derive(Debug, Clone, PartialEq)]
pub struct SignUpOutcome {
    pub user: Option<AuthUser>,
    pub session: Option<Session>,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The provider refused the request (bad credentials, duplicate account, ...).
    #[error("{0}")]
    Rejected(String),

    #[error("auth provider unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected auth provider response ({status}): {body}")]
    Unexpected { status: u16, body: String },
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: Option<Value>,
    ) -> Result<SignUpOutcome, AuthError>;

    async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError>;
}

/// GoTrue-compatible auth provider (`<SUPABASE_URL>/auth/v1`).
#[derive(Debug, Clone)]
pub struct SupabaseAuth {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseAuth {
    pub fn new(config: &UpstreamConfig, client: Client) -> Self {
        Self {
            client,
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, AuthError> {
        let response = self
            .client
            .post(self.endpoint(path))
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            return serde_json::from_str(&text).map_err(|_| AuthError::Unexpected {
                status: status.as_u16(),
                body: text,
            });
        }

        if status.is_client_error() {
            return Err(AuthError::Rejected(provider_message(status, &text)));
        }

        Err(AuthError::Unexpected {
            status: status.as_u16(),
            body: text,
        })
    }
}

#[async_trait]
impl AuthProvider for SupabaseAuth {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let body = serde_json::json!({ "email": email, "password": password });
        let value = self.post("token?grant_type=password", body).await?;
        parse_session(value)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: Option<Value>,
    ) -> Result<SignUpOutcome, AuthError> {
        let mut body = serde_json::json!({ "email": email, "password": password });
        if let Some(data) = metadata {
            body["data"] = data;
        }
        let value = self.post("signup", body).await?;

        // With autoconfirm the provider answers with a session, otherwise with the bare user.
        if value.get("access_token").is_some() {
            let session = parse_session(value)?;
            return Ok(SignUpOutcome {
                user: session.user.clone(),
                session: Some(session),
            });
        }

        let user = serde_json::from_value::<AuthUser>(value).map_err(|e| AuthError::Unexpected {
            status: StatusCode::OK.as_u16(),
            body: e.to_string(),
        })?;
        Ok(SignUpOutcome {
            user: Some(user),
            session: None,
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let body = serde_json::json!({ "refresh_token": refresh_token });
        let value = self.post("token?grant_type=refresh_token", body).await?;
        parse_session(value)
    }
}

fn parse_session(value: Value) -> Result<Session, AuthError> {
    serde_json::from_value(value).map_err(|e| AuthError::Unexpected {
        status: StatusCode::OK.as_u16(),
        body: e.to_string(),
    })
}

/// Best human-readable message in a provider error body.
fn provider_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            ["error_description", "msg", "message", "error"]
                .iter()
                .find_map(|key| v.get(*key).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request rejected")
                .to_string()
        })
}
