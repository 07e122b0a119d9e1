//! Authentication routes: sign-in, sign-up, token refresh.
//!
//! Each handler validates its body, forwards it to the `AuthProvider` and maps
//! the outcome. Authentication failures never reveal which field was wrong, and
//! passwords are never logged.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use crate::http::request::ClientIp;
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::security::validation::{self, Checks, FieldError, Validate, Validated};
use crate::upstream::{AuthError, AuthUser, Session};

const FULL_NAME_MAX_LEN: usize = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct SignInRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl Validate for SignInRequest {
    fn validate(self) -> Result<Self, Vec<FieldError>> {
        let mut checks = Checks::new();
        let email = checks.field(validation::email("email", &self.email));
        let password = checks.field(validation::required("password", &self.password));
        checks.finish(|| {
            Some(Self {
                email: email?,
                password: password?,
            })
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignUpRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

impl Validate for SignUpRequest {
    fn validate(self) -> Result<Self, Vec<FieldError>> {
        let mut checks = Checks::new();
        let email = checks.field(validation::email("email", &self.email));
        let password = checks.field(validation::password("password", &self.password));
        let full_name = match self.full_name.as_deref() {
            Some(name) => checks
                .field(validation::text("full_name", name, FULL_NAME_MAX_LEN))
                .map(Some),
            None => Some(None),
        };
        checks.finish(|| {
            Some(Self {
                email: email?,
                password: password?,
                full_name: full_name?.filter(|n| !n.is_empty()),
            })
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: String,
}

impl Validate for RefreshRequest {
    fn validate(self) -> Result<Self, Vec<FieldError>> {
        let mut checks = Checks::new();
        let refresh_token = checks.field(validation::required("refresh_token", &self.refresh_token));
        checks.finish(|| {
            Some(Self {
                refresh_token: refresh_token?,
            })
        })
    }
}

#[derive(Debug, Serialize)]
pub struct SignInResponse {
    pub success: bool,
    pub user: Option<AuthUser>,
    pub session: Session,
}

#[derive(Debug, Serialize)]
pub struct SignUpResponse {
    pub success: bool,
    pub user: Option<AuthUser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub success: bool,
    pub session: Session,
}

fn unexpected(operation: &str, error: &AuthError) -> ApiError {
    tracing::error!(operation = operation, error = %error, "Auth provider call failed");
    ApiError::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error",
        "An unexpected error occurred",
    )
}

pub async fn sign_in(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Validated(body): Validated<SignInRequest>,
) -> Result<impl IntoResponse, ApiError> {
    match state.auth.sign_in(&body.email, &body.password).await {
        Ok(session) => {
            tracing::info!(email = %body.email, ip = %ip, "Sign-in succeeded");
            Ok(Json(SignInResponse {
                success: true,
                user: session.user.clone(),
                session,
            }))
        }
        Err(AuthError::Rejected(reason)) => {
            tracing::warn!(email = %body.email, ip = %ip, reason = %reason, "Sign-in rejected");
            Err(ApiError::new(
                StatusCode::UNAUTHORIZED,
                "Authentication failed",
                "Invalid email or password",
            ))
        }
        Err(e) => Err(unexpected("sign_in", &e)),
    }
}

pub async fn sign_up(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Validated(body): Validated<SignUpRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let metadata = body
        .full_name
        .as_ref()
        .map(|name| serde_json::json!({ "full_name": name }));

    match state.auth.sign_up(&body.email, &body.password, metadata).await {
        Ok(outcome) => {
            tracing::info!(email = %body.email, ip = %ip, "Sign-up succeeded");
            let message = if outcome.session.is_some() {
                "Registration successful."
            } else {
                "Registration successful. Please check your email to verify your account."
            };
            Ok(Json(SignUpResponse {
                success: true,
                user: outcome.user,
                session: outcome.session,
                message,
            }))
        }
        Err(AuthError::Rejected(reason)) => {
            tracing::warn!(email = %body.email, ip = %ip, reason = %reason, "Sign-up rejected");
            Err(ApiError::new(StatusCode::BAD_REQUEST, "Registration failed", reason))
        }
        Err(e) => Err(unexpected("sign_up", &e)),
    }
}

pub async fn refresh(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Validated(body): Validated<RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    match state.auth.refresh(&body.refresh_token).await {
        Ok(session) => {
            tracing::info!(ip = %ip, "Token refresh succeeded");
            Ok(Json(RefreshResponse {
                success: true,
                session,
            }))
        }
        Err(AuthError::Rejected(reason)) => {
            tracing::warn!(ip = %ip, reason = %reason, "Token refresh rejected");
            Err(ApiError::new(
                StatusCode::UNAUTHORIZED,
                "Token refresh failed",
                "Invalid or expired refresh token",
            ))
        }
        Err(e) => Err(unexpected("refresh", &e)),
    }
}
