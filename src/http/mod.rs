//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, client IP)
//!     → handlers/ (health, auth, admin pass-through, dev events)
//!     → response.rs (uniform JSON error bodies)
//!     → Send to client
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::{client_ip, ClientIp, X_REQUEST_ID};
pub use response::ApiError;
pub use server::{build_router, AppState, GatewayServer};
