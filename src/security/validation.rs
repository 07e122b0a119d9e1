//! Declarative request validation.
//!
//! # Responsibilities
//! - Field validators: email, password complexity, generic text, HTML content
//! - `Validate` trait implemented by request bodies
//! - `Validated<T>` extractor that rejects with 400 before a handler runs
//!
//! # Design Decisions
//! - Validators return the sanitized value so handlers only see clean input
//! - Every failing field is reported, not just the first
//! - `sanitize_html` is a regex denylist, not an HTML parser. It strips script
//!   and iframe blocks, inline event handlers and `javascript:` URIs, and will
//!   miss anything more creative

use axum::{
    extract::{
        rejection::{BytesRejection, FormRejection, JsonRejection},
        FromRequest, Request,
    },
    http::{header::CONTENT_TYPE, StatusCode},
    Form, Json,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::http::response::ApiError;

pub const EMAIL_MAX_LEN: usize = 255;
pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 128;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
    )
    .expect("email regex")
});
static LOWER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z]").expect("lowercase regex"));
static UPPER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Z]").expect("uppercase regex"));
static DIGIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]").expect("digit regex"));

static SCRIPT_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("script regex"));
static IFRAME_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<iframe\b[^>]*>.*?</iframe\s*>").expect("iframe regex"));
static STRAY_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</?(?:script|iframe)\b[^>]*>").expect("stray tag regex"));
static EVENT_HANDLER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\s+on[a-z]+\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]+)"#).expect("event handler regex")
});
static JS_URI_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)javascript\s*:").expect("javascript uri regex"));

/// One failing field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// A request body that can check and sanitize itself.
pub trait Validate: Sized {
    /// Return the sanitized value, or every field error found.
    fn validate(self) -> Result<Self, Vec<FieldError>>;
}

/// Collects field results so a body can report every failure at once.
#[derive(Debug, Default)]
pub struct Checks {
    errors: Vec<FieldError>,
}

impl Checks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the sanitized value of a passing field; record the error of a failing one.
    pub fn field<T>(&mut self, result: Result<T, FieldError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.errors.push(e);
                None
            }
        }
    }

    /// Finish; `build` runs only when every field passed.
    pub fn finish<T>(self, build: impl FnOnce() -> Option<T>) -> Result<T, Vec<FieldError>> {
        if !self.errors.is_empty() {
            return Err(self.errors);
        }
        // Every field passed, so `build` has all of its values.
        build().ok_or_else(Vec::new)
    }
}

/// Trim, format-check, length-cap and lowercase an email address.
pub fn email(field: &str, value: &str) -> Result<String, FieldError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FieldError::new(field, "Email is required"));
    }
    if trimmed.chars().count() > EMAIL_MAX_LEN {
        return Err(FieldError::new(
            field,
            format!("Email must not exceed {} characters", EMAIL_MAX_LEN),
        ));
    }
    if !EMAIL_RE.is_match(trimmed) {
        return Err(FieldError::new(field, "Please provide a valid email address"));
    }
    Ok(trimmed.to_lowercase())
}

/// Length 8-128 with at least one lower-case letter, one upper-case letter and one digit.
pub fn password(field: &str, value: &str) -> Result<String, FieldError> {
    let len = value.chars().count();
    if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len) {
        return Err(FieldError::new(
            field,
            format!(
                "Password must be between {} and {} characters",
                PASSWORD_MIN_LEN, PASSWORD_MAX_LEN
            ),
        ));
    }
    if !(LOWER_RE.is_match(value) && UPPER_RE.is_match(value) && DIGIT_RE.is_match(value)) {
        return Err(FieldError::new(
            field,
            "Password must contain at least one lowercase letter, one uppercase letter, and one number",
        ));
    }
    Ok(value.to_string())
}

/// Presence check for opaque tokens; no trimming or escaping.
pub fn required(field: &str, value: &str) -> Result<String, FieldError> {
    if value.trim().is_empty() {
        return Err(FieldError::new(field, format!("{} is required", field)));
    }
    Ok(value.to_string())
}

/// Trim, length-cap and HTML-escape free text.
pub fn text(field: &str, value: &str, max_len: usize) -> Result<String, FieldError> {
    let trimmed = value.trim();
    if trimmed.chars().count() > max_len {
        return Err(FieldError::new(
            field,
            format!("{} must not exceed {} characters", field, max_len),
        ));
    }
    Ok(escape_html(trimmed))
}

/// Escape the characters significant in HTML.
pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            _ => out.push(c),
        }
    }
    out
}

/// Strip script/iframe blocks, inline event handlers and `javascript:` URIs.
pub fn sanitize_html(value: &str) -> String {
    let out = SCRIPT_BLOCK_RE.replace_all(value, "");
    let out = IFRAME_BLOCK_RE.replace_all(&out, "");
    let out = STRAY_TAG_RE.replace_all(&out, "");
    let out = EVENT_HANDLER_RE.replace_all(&out, "");
    let out = JS_URI_RE.replace_all(&out, "");
    out.into_owned()
}

/// Apply `sanitize_html` to every string in a JSON document.
pub fn sanitize_json_strings(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::String(s) => {
            let clean = sanitize_html(s);
            if clean != *s {
                *s = clean;
            }
        }
        serde_json::Value::Array(items) => items.iter_mut().for_each(sanitize_json_strings),
        serde_json::Value::Object(map) => map.values_mut().for_each(sanitize_json_strings),
        _ => {}
    }
}

/// Extractor: parse a JSON or url-encoded body, then run its `Validate` chain.
#[derive(Debug, Clone)]
pub struct Validated<T>(pub T);

impl<T, S> FromRequest<S> for Validated<T>
where
    T: DeserializeOwned + Validate + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        let value = if is_form {
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(form_rejection)?;
            value
        } else {
            let Json(value) = Json::<T>::from_request(req, state)
                .await
                .map_err(json_rejection)?;
            value
        };

        value.validate().map(Validated).map_err(ApiError::validation)
    }
}

fn json_rejection(rejection: JsonRejection) -> ApiError {
    if let JsonRejection::JsonDataError(ref err) = rejection {
        if let Some(field) = json_field_error(&err.body_text()) {
            return ApiError::validation(vec![field]);
        }
    }
    body_rejection(rejection.status(), rejection.body_text())
}

/// Turn serde's `path: message at line L column C` into a field error.
fn json_field_error(detail: &str) -> Option<FieldError> {
    let detail = detail
        .split_once("target type: ")
        .map_or(detail, |(_, rest)| rest);
    let (path, message) = detail.split_once(": ")?;
    if path.is_empty() || path == "." || path.contains(char::is_whitespace) {
        return None;
    }
    let message = message
        .rsplit_once(" at line ")
        .map_or(message, |(head, _)| head);
    Some(FieldError::new(path, message))
}

/// Map a raw body rejection (pass-through routes) to the JSON error shape.
pub fn bytes_rejection(rejection: BytesRejection) -> ApiError {
    body_rejection(rejection.status(), rejection.body_text())
}

fn form_rejection(rejection: FormRejection) -> ApiError {
    body_rejection(rejection.status(), rejection.body_text())
}

fn body_rejection(status: StatusCode, detail: String) -> ApiError {
    tracing::debug!(status = %status, detail = %detail, "Rejected request body");
    match status {
        StatusCode::PAYLOAD_TOO_LARGE => ApiError::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            "Payload too large",
            "Request body exceeds the size limit",
        ),
        StatusCode::UNSUPPORTED_MEDIA_TYPE => ApiError::new(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Unsupported media type",
            "Expected a JSON or url-encoded body",
        ),
        _ => ApiError::new(StatusCode::BAD_REQUEST, "Invalid request body", detail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_type_error_names_field() {
        let field = json_field_error(
            "Failed to deserialize the JSON body into the target type: email: invalid type: integer `5`, expected a string at line 1 column 11",
        )
        .unwrap();
        assert_eq!(field.field, "email");
        assert_eq!(field.message, "invalid type: integer `5`, expected a string");

        assert!(json_field_error(
            "Failed to deserialize the JSON body into the target type: invalid type: integer `5`, expected struct SignInRequest at line 1 column 1"
        )
        .is_none());
    }

    #[test]
    fn test_email() {
        assert_eq!(email("email", "  Coach@League.ORG ").unwrap(), "coach@league.org");
        assert!(email("email", "").is_err());
        assert!(email("email", "not-an-email").is_err());
        assert!(email("email", "a@b").is_err());

        let long = format!("{}@example.com", "a".repeat(250));
        let err = email("email", &long).unwrap_err();
        assert_eq!(err.message, "Email must not exceed 255 characters");
    }

    #[test]
    fn test_password_complexity() {
        assert!(password("password", "Goalie2024").is_ok());
        assert!(password("password", "Short1A").is_err());
        assert!(password("password", &format!("Aa1{}", "x".repeat(126))).is_err());

        let err = password("password", "NoDigitsHere").unwrap_err();
        assert_eq!(err.field, "password");
        assert!(password("password", "alllower123").is_err());
        assert!(password("password", "ALLUPPER123").is_err());
    }

    #[test]
    fn test_text_trims_and_escapes() {
        assert_eq!(
            text("name", "  <b>Tom & Jerry</b> ", 100).unwrap(),
            "&lt;b&gt;Tom &amp; Jerry&lt;&#x2F;b&gt;"
        );
        assert!(text("name", &"x".repeat(101), 100).is_err());
    }

    #[test]
    fn test_sanitize_html() {
        assert_eq!(
            sanitize_html("<p>Hi</p><script>alert(1)</script><b>there</b>"),
            "<p>Hi</p><b>there</b>"
        );
        assert_eq!(
            sanitize_html("<IFRAME src=\"x\">\n</iframe>ok"),
            "ok"
        );
        assert_eq!(
            sanitize_html(r#"<img src="a.png" onerror="steal()">"#),
            r#"<img src="a.png">"#
        );
        assert_eq!(
            sanitize_html(r#"<a href="javascript:alert(1)">x</a>"#),
            r#"<a href="alert(1)">x</a>"#
        );
        assert_eq!(sanitize_html("<script src=evil.js>"), "");
    }

    #[test]
    fn test_sanitize_json_strings() {
        let mut doc = serde_json::json!({
            "question": "<script>x</script>Who?",
            "tags": ["<b onclick=go()>ok</b>"],
            "order": 3
        });
        sanitize_json_strings(&mut doc);
        assert_eq!(doc["question"], "Who?");
        assert_eq!(doc["tags"][0], "<b>ok</b>");
        assert_eq!(doc["order"], 3);
    }

    #[test]
    fn test_checks_reports_every_field() {
        let mut checks = Checks::new();
        let e = checks.field(email("email", "nope"));
        let p = checks.field(password("password", "weak"));
        let result: Result<(String, String), _> = checks.finish(|| Some((e?, p?)));
        let errors = result.unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "email");
        assert_eq!(errors[1].field, "password");
    }
}
