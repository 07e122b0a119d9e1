//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → headers.rs (security response headers, applied on the way out)
//!     → cors.rs (origin allow-list, preflight handling)
//!     → limits.rs (decompression, body cap, compression)
//!     → rate_limit.rs (general tier, then auth/admin tier per route)
//!     → validation.rs (field validators, before the handler)
//! ```
//!
//! # Design Decisions
//! - Defense in depth: multiple layers of protection
//! - Fail closed: reject on any security check failure
//! - No trust in client input

pub mod cors;
pub mod headers;
pub mod limits;
pub mod rate_limit;
pub mod validation;

pub use headers::{security_headers_middleware, SecurityHeaders};
pub use rate_limit::{rate_limit_middleware, RateLimiter, RateLimiters};
pub use validation::{FieldError, Validate, Validated};
