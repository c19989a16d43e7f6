//! Request handling helpers.
//!
//! # Responsibilities
//! - Generate unique request IDs (UUID v4) and echo them on responses
//! - Resolve the public origin used to absolutize root-relative locators
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Forwarded headers are ignored unless explicitly trusted

use axum::http::{header, HeaderMap, HeaderName};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use url::Url;

use crate::config::OriginConfig;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");
const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");
const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");

/// Layer assigning an `x-request-id` to requests that lack one.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid)
}

/// Layer copying the request's `x-request-id` onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(X_REQUEST_ID)
}

/// The request ID assigned by [`set_request_id_layer`].
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Work out the origin root-relative locators resolve against.
///
/// The configured public base URL wins. Otherwise the request's `Host` (and,
/// when trusted, `X-Forwarded-*`) is used together with `default_scheme`.
pub fn public_origin(
    headers: &HeaderMap,
    origin: &OriginConfig,
    default_scheme: &str,
) -> Option<Url> {
    if let Some(base) = &origin.public_base_url {
        return Url::parse(base).ok();
    }

    let forwarded = |name: &HeaderName| {
        origin
            .trust_forwarded_headers
            .then(|| first_value(headers, name))
            .flatten()
    };

    let scheme = match forwarded(&X_FORWARDED_PROTO) {
        Some(proto) if proto.eq_ignore_ascii_case("https") => "https",
        Some(proto) if proto.eq_ignore_ascii_case("http") => "http",
        _ => default_scheme,
    };
    let host = forwarded(&X_FORWARDED_HOST).or_else(|| first_value(headers, &header::HOST))?;
    if !is_valid_authority(host) {
        return None;
    }

    Url::parse(&format!("{scheme}://{host}/")).ok()
}

fn first_value<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    let value = headers.get(name)?.to_str().ok()?;
    let first = value.split(',').next()?.trim();
    (!first.is_empty()).then_some(first)
}

/// Host with optional port; rejects userinfo, paths and anything else a URL
/// parser would treat as structure.
fn is_valid_authority(host: &str) -> bool {
    !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | '[' | ']'))
}
