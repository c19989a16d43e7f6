//! Token signing.
//!
//! The signature is HMAC-SHA256 over `locator|expiry`, hex encoded. Signing is
//! deterministic: the expiry is the only state a token needs.

use std::sync::Arc;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::token::clock::{Clock, SystemClock};
use crate::token::{codec, Token};

type HmacSha256 = Hmac<Sha256>;

/// Raised when a signer is constructed without a usable secret.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("signing secret is missing or empty")]
pub struct MissingSecret;

/// A freshly minted token together with its expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: u64,
}

/// Signs `(locator, expiry)` pairs with the process secret.
pub struct TokenSigner {
    mac: HmacSha256,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("key", &"<redacted>")
            .field("clock", &self.clock)
            .finish()
    }
}

impl TokenSigner {
    /// Create a signer using wall-clock time.
    pub fn new(secret: &str) -> Result<Self, MissingSecret> {
        Self::with_clock(secret, Arc::new(SystemClock))
    }

    pub fn with_clock(secret: &str, clock: Arc<dyn Clock>) -> Result<Self, MissingSecret> {
        if secret.trim().is_empty() {
            return Err(MissingSecret);
        }
        let mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| MissingSecret)?;
        Ok(Self { mac, clock })
    }

    /// Current time according to this signer's clock.
    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    /// Compute the hex signature for `locator|expiry`.
    pub fn sign(&self, locator: &str, expiry: u64) -> String {
        let mut mac = self.mac.clone();
        mac.update(locator.as_bytes());
        mac.update(b"|");
        mac.update(expiry.to_string().as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Constant-time check of a transmitted signature against the expected one.
    pub fn signature_matches(&self, locator: &str, expiry: u64, signature: &str) -> bool {
        let expected = self.sign(locator, expiry);
        bool::from(expected.as_bytes().ct_eq(signature.as_bytes()))
    }

    /// Mint a token for `locator` valid for `ttl_secs` from now.
    pub fn issue_token(&self, locator: &str, ttl_secs: u64) -> IssuedToken {
        let expires_at = self.clock.now().saturating_add(ttl_secs);
        let token = Token {
            encoded_locator: codec::encode(locator),
            expires_at: expires_at.to_string(),
            signature: self.sign(locator, expires_at),
        };
        IssuedToken {
            token: token.to_string(),
            expires_at,
        }
    }
}
