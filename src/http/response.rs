//! Response handling and transformation.
//!
//! # Responsibilities
//! - Build the client response from an upstream response
//! - Forward only Content-Type, Content-Length and Cache-Control
//! - Fixed, detail-free bodies for every rejection
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - Upstream error bodies are never forwarded
//! - Rejections look the same whichever check failed

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

/// Stream an upstream response back to the client.
pub fn stream_upstream(
    upstream: reqwest::Response,
    default_cache_control: &HeaderValue,
) -> Response {
    let headers = upstream.headers();
    let content_type = headers.get(header::CONTENT_TYPE).cloned();
    let cache_control = headers
        .get(header::CACHE_CONTROL)
        .cloned()
        .unwrap_or_else(|| default_cache_control.clone());
    let content_length = upstream.content_length();

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = StatusCode::OK;

    let out = response.headers_mut();
    if let Some(content_type) = content_type {
        out.insert(header::CONTENT_TYPE, content_type);
    }
    if let Some(len) = content_length {
        out.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    }
    out.insert(header::CACHE_CONTROL, cache_control);
    response
}

/// `400` with no detail.
pub fn bad_request() -> Response {
    rejection(StatusCode::BAD_REQUEST, "Bad request")
}

/// `403` for every verification failure.
pub fn forbidden() -> Response {
    rejection(StatusCode::FORBIDDEN, "Invalid token")
}

/// `502` for unreachable or failing upstreams.
pub fn bad_gateway() -> Response {
    rejection(StatusCode::BAD_GATEWAY, "Upstream request failed")
}

/// `504` when the upstream misses its deadline.
pub fn gateway_timeout() -> Response {
    rejection(StatusCode::GATEWAY_TIMEOUT, "Upstream request timed out")
}

fn rejection(status: StatusCode, message: &'static str) -> Response {
    (
        status,
        [(header::CACHE_CONTROL, HeaderValue::from_static("no-store"))],
        message,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejections_are_not_cacheable() {
        for response in [bad_request(), forbidden(), bad_gateway(), gateway_timeout()] {
            assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
        }
        assert_eq!(forbidden().status(), StatusCode::FORBIDDEN);
        assert_eq!(gateway_timeout().status(), StatusCode::GATEWAY_TIMEOUT);
    }
}
