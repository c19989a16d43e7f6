//! Header policy.
//!
//! # Responsibilities
//! - Fixed outbound header set for upstream fetches
//! - Security headers on every response
//!
//! # Design Decisions
//! - Inbound headers are never copied to the upstream request
//! - Only Content-Type, Content-Length and Cache-Control come back from upstream

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use tower_http::set_header::SetResponseHeaderLayer;

/// Accept header sent upstream.
pub const UPSTREAM_ACCEPT: &str = "image/avif,image/webp,image/*,*/*;q=0.8";

/// The complete header set of an outbound request.
pub fn outbound_headers(user_agent: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, HeaderValue::from_static(UPSTREAM_ACCEPT));
    if let Ok(ua) = HeaderValue::from_str(user_agent) {
        headers.insert(header::USER_AGENT, ua);
    }
    headers
}

/// Layers adding security headers to every response (unless already set).
pub fn security_header_layers() -> [SetResponseHeaderLayer<HeaderValue>; 2] {
    [
        SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ),
        SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("cross-origin-resource-policy"),
            HeaderValue::from_static("cross-origin"),
        ),
    ]
}
