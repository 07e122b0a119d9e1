//! Body size limits and transport encodings.
//!
//! # Responsibilities
//! - Cap JSON / url-encoded bodies (10MB by default)
//! - Decompress gzip request bodies before they are parsed
//! - Gzip responses for clients that accept it
//!
//! # Design Decisions
//! - The cap applies to the decompressed body, as seen by extractors
//! - Oversized bodies surface as 413 through the extractor rejection path

use axum::extract::DefaultBodyLimit;
use tower_http::compression::CompressionLayer;
use tower_http::decompression::RequestDecompressionLayer;

use crate::config::LimitsConfig;

pub fn body_limit(config: &LimitsConfig) -> DefaultBodyLimit {
    DefaultBodyLimit::max(config.max_body_bytes)
}

pub fn request_decompression() -> RequestDecompressionLayer {
    RequestDecompressionLayer::new().gzip(true)
}

pub fn response_compression() -> CompressionLayer {
    CompressionLayer::new().gzip(true)
}
