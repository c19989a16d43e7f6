//! Caller authentication for token issuance.
//!
//! The storefront's authentication system is an external collaborator; this
//! module only defines the seam it plugs into and a bearer-key implementation
//! driven by configuration.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// An authenticated caller, attached to request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    /// Stable, non-secret identifier used for logs and rate limiting.
    pub id: String,
}

/// Decides who, if anyone, is making a request.
pub trait CallerAuthenticator: Send + Sync {
    fn authenticate(&self, headers: &HeaderMap) -> Option<Caller>;
}

/// Accepts `Authorization: Bearer <key>` for any configured key.
pub struct BearerKeyAuthenticator {
    /// SHA-256 digests of the accepted keys.
    keys: Vec<[u8; 32]>,
}

impl BearerKeyAuthenticator {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keys: keys
                .into_iter()
                .filter(|k| !k.as_ref().is_empty())
                .map(|k| digest(k.as_ref()))
                .collect(),
        }
    }
}

impl CallerAuthenticator for BearerKeyAuthenticator {
    fn authenticate(&self, headers: &HeaderMap) -> Option<Caller> {
        let presented = bearer_token(headers)?;
        let presented = digest(presented);

        // Visit every key so timing does not reveal which one matched.
        let mut matched: Option<&[u8; 32]> = None;
        for key in &self.keys {
            if bool::from(key[..].ct_eq(&presented[..])) {
                matched = Some(key);
            }
        }
        matched.map(|key| Caller {
            id: hex::encode(&key[..6]),
        })
    }
}

fn digest(key: &str) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(key.as_bytes()));
    out
}

/// Extract the credential from an `Authorization: Bearer` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Reject unauthenticated requests with 401, otherwise attach the [`Caller`].
pub async fn require_caller(
    State(authenticator): State<Arc<dyn CallerAuthenticator>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    match authenticator.authenticate(request.headers()) {
        Some(caller) => {
            request.extensions_mut().insert(caller);
            next.run(request).await
        }
        None => (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, "Bearer")],
            "Unauthorized",
        )
            .into_response(),
    }
}
