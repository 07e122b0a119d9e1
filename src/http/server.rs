//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with all handlers
//! - Wire up middleware in ingress order
//! - Bind server to listener, serve until shutdown
//! - Sweep expired rate-limit windows in the background
//!
//! # Middleware order (outermost first)
//! ```text
//! catch-panic → security headers → CORS → request ID → trace
//!     → compression → decompression → body limit
//!     → request logger → general limiter
//!     → [auth | admin limiter] → validation extractor → handler
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{any, get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::http::handlers::{self, admin, auth, health};
use crate::http::request::{MakeRequestUuid, X_REQUEST_ID};
use crate::http::response::handle_panic;
use crate::observability::{request_logger_middleware, RequestLogger};
use crate::security::{
    cors::cors_layer, limits, rate_limit_middleware, security_headers_middleware, RateLimiters,
    SecurityHeaders,
};
use crate::upstream::{self, AuthProvider, RestProxy, SupabaseAuth};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub auth: Arc<dyn AuthProvider>,
    pub rest: Arc<RestProxy>,
    pub logger: RequestLogger,
    pub limiters: RateLimiters,
}

impl AppState {
    /// State backed by the hosted provider named in `config.upstream`.
    pub fn new(config: GatewayConfig) -> Result<Self, reqwest::Error> {
        let client = upstream::http_client(&config.upstream)?;
        let auth = Arc::new(SupabaseAuth::new(&config.upstream, client.clone()));
        Ok(Self::with_parts(config, auth, client))
    }

    /// State with a caller-supplied auth provider (tests, alternative providers).
    pub fn with_parts(config: GatewayConfig, auth: Arc<dyn AuthProvider>, client: reqwest::Client) -> Self {
        let rest = Arc::new(RestProxy::new(&config.upstream, client));
        let logger = RequestLogger::new(config.request_log.clone(), config.server.environment);
        let limiters = RateLimiters::from_config(&config.rate_limit);
        Self {
            config: Arc::new(config),
            auth,
            rest,
            logger,
            limiters,
        }
    }
}

/// HTTP server for the gateway.
pub struct GatewayServer {
    router: Router,
    state: AppState,
}

impl GatewayServer {
    /// Create a new server with the given configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::from_state(AppState::new(config)?))
    }

    pub fn from_state(state: AppState) -> Self {
        let router = build_router(state.clone());
        Self { router, state }
    }

    /// The fully layered router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            environment = %self.state.config.server.environment,
            "HTTP server starting"
        );

        let sweeper = spawn_window_sweeper(
            self.state.limiters.clone(),
            Duration::from_secs(self.state.config.rate_limit.sweep_interval_secs),
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await;

        sweeper.abort();
        tracing::info!("HTTP server stopped");
        result
    }
}

/// Assemble routes and the middleware stack.
pub fn build_router(state: AppState) -> Router {
    let config = state.config.clone();
    let rate_limited = config.rate_limit.enabled;

    let mut auth_routes = Router::new()
        .route("/signin", post(auth::sign_in))
        .route("/signup", post(auth::sign_up))
        .route("/refresh", post(auth::refresh));
    if rate_limited {
        auth_routes = auth_routes.route_layer(middleware::from_fn_with_state(
            state.limiters.auth.clone(),
            rate_limit_middleware,
        ));
    }

    let mut admin_routes = Router::new()
        .route("/api/admin/{*path}", any(admin::admin_proxy))
        .route("/api/notifications/{*path}", any(admin::notifications_proxy));
    if rate_limited {
        admin_routes = admin_routes.route_layer(middleware::from_fn_with_state(
            state.limiters.admin.clone(),
            rate_limit_middleware,
        ));
    }

    let mut router = Router::new()
        .route("/health", get(health::health))
        .nest("/api/auth", auth_routes)
        .merge(admin_routes);

    if config.server.environment.is_development() {
        router = router.route(
            "/api/dev/security-events",
            get(admin::list_security_events).delete(admin::clear_security_events),
        );
    }

    let mut router = router.fallback(handlers::not_found).with_state(state.clone());

    // Layers are listed innermost first.
    if rate_limited {
        router = router.layer(middleware::from_fn_with_state(
            state.limiters.general.clone(),
            rate_limit_middleware,
        ));
    }

    router
        .layer(middleware::from_fn_with_state(
            state.logger.clone(),
            request_logger_middleware,
        ))
        .layer(limits::body_limit(&config.limits))
        .layer(limits::request_decompression())
        .layer(limits::response_compression())
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
        .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
        .layer(cors_layer(&config.cors))
        .layer(middleware::from_fn_with_state(
            Arc::new(SecurityHeaders::from_config(&config)),
            security_headers_middleware,
        ))
        .layer(CatchPanicLayer::custom(handle_panic))
}

fn spawn_window_sweeper(limiters: RateLimiters, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let purged = limiters.purge_expired();
            if purged > 0 {
                tracing::debug!(purged = purged, "Expired rate-limit windows removed");
            }
        }
    })
}
