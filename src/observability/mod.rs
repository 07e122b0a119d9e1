//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every request:
//!     → request_log.rs (timing, per-request log line, event classification)
//!     → security_log.rs (bounded FIFO of security events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (logging.rs, pretty or JSON)
//!     → GET /api/dev/security-events (development only)
//!     → Prometheus scrape (optional)
//! ```

pub mod logging;
pub mod metrics;
pub mod request_log;
pub mod security_log;

pub use request_log::{request_logger_middleware, RequestLogger};
pub use security_log::{SecurityEvent, SecurityEventLog, SecurityEventType};
