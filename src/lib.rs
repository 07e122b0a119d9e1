//! League gateway library.
//!
//! Security ingress in front of the league site's hosted auth and database
//! provider: security headers, CORS, rate limiting, request validation,
//! request/security-event logging and thin auth pass-through handlers.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;
pub mod upstream;

pub use config::schema::GatewayConfig;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
