//! Public proxy endpoint.
//!
//! `GET /image-proxy/{token}` (or `?token=`). Safety rests entirely on token
//! verification; no caller credentials are involved.

use std::time::Instant;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Response,
};
use serde::Deserialize;
use url::Url;

use crate::http::request::request_id;
use crate::http::response;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::token::is_root_relative;
use crate::upstream::UpstreamError;

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

/// Token as a path segment.
pub async fn proxy_by_path(
    State(state): State<AppState>,
    Path(token): Path<String>,
    headers: HeaderMap,
) -> Response {
    proxy(state, &headers, Some(token)).await
}

/// Token as a `token` query parameter, or missing entirely.
pub async fn proxy_by_query(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
    headers: HeaderMap,
) -> Response {
    proxy(state, &headers, query.token).await
}

async fn proxy(state: AppState, headers: &HeaderMap, token: Option<String>) -> Response {
    let start = Instant::now();
    let request_id = request_id(headers).to_string();

    let response = match token.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        None => {
            tracing::debug!(request_id = %request_id, "Missing token");
            response::bad_request()
        }
        Some(token) => serve(&state, &request_id, token).await,
    };

    metrics::record_request("proxy", response.status().as_u16(), start);
    response
}

async fn serve(state: &AppState, request_id: &str, token: &str) -> Response {
    let verified = match state.verifier.verify(token) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(request_id = %request_id, reason = e.reason(), "Token rejected");
            metrics::record_verify_failure(e.reason());
            return response::forbidden();
        }
    };

    let target = match fetch_target(&verified.locator, state.public_base_url.as_ref()) {
        Some(url) => url,
        None => {
            tracing::warn!(request_id = %request_id, "Verified locator is not fetchable");
            return response::bad_request();
        }
    };

    let host = target.host_str().unwrap_or_default().to_string();
    match state.upstream.fetch(&target).await {
        Ok(upstream) => {
            tracing::debug!(request_id = %request_id, host = %host, "Streaming upstream response");
            response::stream_upstream(upstream, &state.default_cache_control)
        }
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                host = %host,
                kind = e.kind(),
                error = %e,
                "Upstream fetch failed"
            );
            metrics::record_upstream_error(e.kind());
            match e {
                UpstreamError::UnsupportedScheme(_) => response::bad_request(),
                UpstreamError::Timeout(_) => response::gateway_timeout(),
                UpstreamError::Unreachable(_) | UpstreamError::ErrorStatus(_) => {
                    response::bad_gateway()
                }
            }
        }
    }
}

/// The URL to fetch for a verified locator.
///
/// Root-relative locators resolve only against the configured public origin;
/// the inbound `Host` header is never used here.
pub fn fetch_target(locator: &str, public_base_url: Option<&Url>) -> Option<Url> {
    let url = if is_root_relative(locator) {
        public_base_url?.join(locator).ok()?
    } else {
        Url::parse(locator).ok()?
    };
    (matches!(url.scheme(), "http" | "https") && url.host_str().is_some()).then_some(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_locators_fetch_as_is() {
        let url = fetch_target("https://cdn.example.com/a.png?x=1", None).unwrap();
        assert_eq!(url.as_str(), "https://cdn.example.com/a.png?x=1");
    }

    #[test]
    fn relative_locators_need_a_public_origin() {
        assert!(fetch_target("/uploads/a.png", None).is_none());

        let base = Url::parse("http://127.0.0.1:9000/").unwrap();
        let url = fetch_target("/uploads/a.png", Some(&base)).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/uploads/a.png");
    }

    #[test]
    fn unfetchable_locators_are_rejected() {
        assert!(fetch_target("mailto:someone@example.com", None).is_none());
        assert!(fetch_target("file:///etc/passwd", None).is_none());
        assert!(fetch_target("not a url", None).is_none());
    }
}
