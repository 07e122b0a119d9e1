//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tower::ServiceExt;

use league_gateway::config::{Environment, GatewayConfig};
use league_gateway::http::{build_router, AppState};
use league_gateway::upstream::{AuthError, AuthProvider, AuthUser, Session, SignUpOutcome};

pub const GOOD_PASSWORD: &str = "Goalie2024";
pub const BAD_PASSWORD: &str = "Wrong2024x";

/// Config for an in-process gateway pointed at `upstream`.
pub fn test_config(environment: Environment, upstream: &str) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.server.environment = environment;
    config.upstream.supabase_url = upstream.to_string();
    config.upstream.supabase_anon_key = "anon-test-key".to_string();
    config.upstream.timeout_secs = 5;
    config
}

/// Outbound client for tests; never routed through an environment proxy.
pub fn test_client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

/// In-memory auth provider. Accepts `GOOD_PASSWORD`, rejects everything else.
#[derive(Default)]
pub struct MockAuth {
    pub sign_in_calls: AtomicUsize,
    pub sign_up_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub last_metadata: Mutex<Option<Value>>,
}

impl MockAuth {
    pub fn calls(&self) -> usize {
        self.sign_in_calls.load(Ordering::SeqCst)
            + self.sign_up_calls.load(Ordering::SeqCst)
            + self.refresh_calls.load(Ordering::SeqCst)
    }
}

fn session(email: &str) -> Session {
    Session {
        access_token: "access-token".to_string(),
        token_type: "bearer".to_string(),
        expires_in: 3600,
        expires_at: None,
        refresh_token: "refresh-token".to_string(),
        user: Some(AuthUser {
            id: "user-1".to_string(),
            email: Some(email.to_string()),
            extra: Default::default(),
        }),
    }
}

#[async_trait]
impl AuthProvider for MockAuth {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        if password == GOOD_PASSWORD {
            Ok(session(email))
        } else {
            Err(AuthError::Rejected("Invalid login credentials".to_string()))
        }
    }

    async fn sign_up(
        &self,
        email: &str,
        _password: &str,
        metadata: Option<Value>,
    ) -> Result<SignUpOutcome, AuthError> {
        self.sign_up_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_metadata.lock().unwrap() = metadata;
        if email.starts_with("taken") {
            return Err(AuthError::Rejected("User already registered".to_string()));
        }
        Ok(SignUpOutcome {
            user: session(email).user,
            session: None,
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if refresh_token == "refresh-token" {
            Ok(session("player@league.org"))
        } else {
            Err(AuthError::Rejected("Invalid Refresh Token".to_string()))
        }
    }
}

/// An in-process gateway with a mock auth provider.
pub struct TestGateway {
    pub state: AppState,
    pub auth: Arc<MockAuth>,
    pub router: axum::Router,
}

impl TestGateway {
    pub fn new(config: GatewayConfig) -> Self {
        let auth = Arc::new(MockAuth::default());
        let state = AppState::with_parts(config, auth.clone(), test_client());
        let router = build_router(state.clone());
        Self { state, auth, router }
    }

    pub fn development() -> Self {
        Self::new(test_config(Environment::Development, "http://127.0.0.1:1"))
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

pub fn json_request(method: &str, uri: &str, ip: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-forwarded-for", ip)
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_request(uri: &str, ip: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-forwarded-for", ip)
        .body(Body::empty())
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Requests seen by a mock upstream, as raw HTTP text.
pub type Captured = Arc<Mutex<Vec<String>>>;

/// Start a programmable mock upstream on an ephemeral port.
///
/// `f` receives the raw request text and returns the status and JSON body to answer with.
pub async fn start_programmable_backend<F, Fut>(f: F) -> (SocketAddr, Captured)
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let captured: Captured = Arc::new(Mutex::new(Vec::new()));
    let f = Arc::new(f);

    let seen = captured.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    let seen = seen.clone();
                    tokio::spawn(async move {
                        let raw = read_request(&mut socket).await;
                        seen.lock().unwrap().push(raw.clone());
                        let (status, body) = f(raw).await;
                        let status_text = match status {
                            200 => "200 OK",
                            201 => "201 Created",
                            400 => "400 Bad Request",
                            401 => "401 Unauthorized",
                            422 => "422 Unprocessable Entity",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, captured)
}

/// Read one request (head plus `Content-Length` body).
async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(head_end) = text.find("\r\n\r\n") {
            let content_length = text[..head_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= head_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}
