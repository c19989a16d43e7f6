//! Token verification: the single place every security check lives.

use std::sync::Arc;

use thiserror::Error;

use crate::token::policy::HostPolicy;
use crate::token::signer::TokenSigner;
use crate::token::{codec, Token};

/// Why a token was rejected.
///
/// The variants are logged and counted; clients only ever see a generic
/// rejection.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq, Hash)]
pub enum VerifyError {
    #[error("token is malformed")]
    InvalidFormat,
    #[error("token expiry is not a timestamp")]
    BadExpiry,
    #[error("token has expired")]
    Expired,
    #[error("token signature does not match")]
    BadSignature,
    #[error("token locator is not a valid URL")]
    BadUrl,
    #[error("token locator host is not allowed")]
    HostNotAllowed,
}

impl VerifyError {
    /// Stable tag for logs and metric labels.
    pub fn reason(&self) -> &'static str {
        match self {
            VerifyError::InvalidFormat => "invalid-format",
            VerifyError::BadExpiry => "bad-expiry",
            VerifyError::Expired => "expired",
            VerifyError::BadSignature => "bad-signature",
            VerifyError::BadUrl => "bad-url",
            VerifyError::HostNotAllowed => "host-not-allowed",
        }
    }
}

/// Result of a successful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub locator: String,
    pub expires_at: u64,
}

/// Checks tokens against the signer's secret and the host policy.
#[derive(Debug, Clone)]
pub struct Verifier {
    signer: Arc<TokenSigner>,
    policy: Arc<HostPolicy>,
}

impl Verifier {
    pub fn new(signer: Arc<TokenSigner>, policy: Arc<HostPolicy>) -> Self {
        Self { signer, policy }
    }

    pub fn policy(&self) -> &HostPolicy {
        &self.policy
    }

    /// Verify `raw`, short-circuiting on the first failed check.
    ///
    /// Order: structure, locator encoding, expiry syntax, expiry time,
    /// signature, host policy.
    pub fn verify(&self, raw: &str) -> Result<VerifiedToken, VerifyError> {
        let token = Token::parse(raw).ok_or(VerifyError::InvalidFormat)?;
        let locator =
            codec::decode(&token.encoded_locator).map_err(|_| VerifyError::InvalidFormat)?;
        let expires_at = parse_expiry(&token.expires_at)?;

        if self.signer.now() > expires_at {
            return Err(VerifyError::Expired);
        }
        if !self
            .signer
            .signature_matches(&locator, expires_at, &token.signature)
        {
            return Err(VerifyError::BadSignature);
        }
        self.policy.check(&locator)?;

        Ok(VerifiedToken {
            locator,
            expires_at,
        })
    }
}

/// Digits only, no sign and no leading zeros, so each expiry has one spelling.
fn parse_expiry(raw: &str) -> Result<u64, VerifyError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(VerifyError::BadExpiry);
    }
    if raw.len() > 1 && raw.starts_with('0') {
        return Err(VerifyError::BadExpiry);
    }
    raw.parse().map_err(|_| VerifyError::BadExpiry)
}
