//! Token issuance endpoint.
//!
//! `POST /api/image-proxy/token` with `{ "url": ..., "ttlSeconds": ... }`.
//! Runs behind [`require_caller`](crate::security::auth::require_caller).

use std::time::Instant;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::http::request::{public_origin, request_id};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::security::auth::Caller;
use crate::token::{is_root_relative, VerifyError};

#[derive(Debug, Deserialize)]
pub struct IssueRequest {
    pub url: String,
    #[serde(default, rename = "ttlSeconds")]
    pub ttl_seconds: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueResponse {
    pub token: String,
    pub expires_at: u64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IssueError {
    #[error("body must be a JSON object with a string `url`")]
    InvalidBody,
    #[error("`url` must be a root-relative path or an absolute http(s) URL")]
    InvalidLocator,
    #[error("`ttlSeconds` must be at least 1")]
    InvalidTtl,
    #[error("cannot determine the public origin for a relative `url`")]
    UnknownOrigin,
    #[error("host is not allowed")]
    HostNotAllowed,
}

impl IssueError {
    pub fn status(&self) -> StatusCode {
        match self {
            IssueError::HostNotAllowed => StatusCode::FORBIDDEN,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for IssueError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

/// Clamp a requested lifetime to `[1, max]`, defaulting when absent.
pub fn effective_ttl(requested: Option<u64>, default: u64, max: u64) -> Result<u64, IssueError> {
    match requested {
        Some(0) => Err(IssueError::InvalidTtl),
        Some(ttl) => Ok(ttl.min(max)),
        None => Ok(default.min(max)),
    }
}

/// Turn caller input into the absolute locator that gets signed.
pub fn normalize_locator(raw: &str, origin: Option<&Url>) -> Result<Url, IssueError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(IssueError::InvalidLocator);
    }

    let url = if is_root_relative(raw) {
        origin
            .ok_or(IssueError::UnknownOrigin)?
            .join(raw)
            .map_err(|_| IssueError::InvalidLocator)?
    } else {
        Url::parse(raw).map_err(|_| IssueError::InvalidLocator)?
    };

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(IssueError::InvalidLocator);
    }
    Ok(url)
}

pub async fn issue_token(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let start = Instant::now();
    let request_id = request_id(&headers).to_string();

    let response = match mint(&state, &headers, &body) {
        Ok(issued) => {
            tracing::info!(
                request_id = %request_id,
                caller = %caller.id,
                expires_at = issued.expires_at,
                "Token issued"
            );
            metrics::record_token_issued();
            (StatusCode::OK, Json(issued)).into_response()
        }
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                caller = %caller.id,
                error = %e,
                "Token issuance rejected"
            );
            e.into_response()
        }
    };

    metrics::record_request("issue", response.status().as_u16(), start);
    response
}

fn mint(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<IssueResponse, IssueError> {
    let request: IssueRequest =
        serde_json::from_slice(body).map_err(|_| IssueError::InvalidBody)?;

    let signing = &state.config.signing;
    let ttl = effective_ttl(request.ttl_seconds, signing.default_ttl_secs, signing.max_ttl_secs)?;

    let same_origin = is_root_relative(request.url.trim());
    let origin = public_origin(headers, &state.config.origin, state.default_scheme);
    let locator = normalize_locator(&request.url, origin.as_ref())?;

    // Root-relative input is trusted as given; anything else meets the same
    // policy the proxy applies.
    if !same_origin {
        state
            .verifier
            .policy()
            .check(locator.as_str())
            .map_err(|e| match e {
                VerifyError::HostNotAllowed => IssueError::HostNotAllowed,
                _ => IssueError::InvalidLocator,
            })?;
    }

    let issued = state.signer.issue_token(locator.as_str(), ttl);
    Ok(IssueResponse {
        token: issued.token,
        expires_at: issued.expires_at,
    })
}
