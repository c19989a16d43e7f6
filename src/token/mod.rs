//! Signed capability tokens.
//!
//! # Data Flow
//! ```text
//! issuance:
//!     locator + ttl
//!     → signer.rs (expiry = now + ttl, HMAC over "locator|expiry")
//!     → codec.rs (base64url locator)
//!     → "<locator>.<expiry>.<signature>"
//!
//! proxy:
//!     "<locator>.<expiry>.<signature>"
//!     → verifier.rs (format → expiry → signature → policy.rs)
//!     → authorized locator
//! ```
//!
//! # Design Decisions
//! - Tokens are stateless; the secret and the expiry are the only inputs
//! - `.` is outside every segment's alphabet, so splitting is unambiguous
//! - Signatures are compared in constant time

pub mod clock;
pub mod codec;
pub mod policy;
pub mod signer;
pub mod verifier;

pub use clock::{Clock, ManualClock, SystemClock};
pub use policy::{is_root_relative, HostPolicy};
pub use signer::{IssuedToken, MissingSecret, TokenSigner};
pub use verifier::{VerifiedToken, Verifier, VerifyError};

/// Separator between token segments.
pub const DELIMITER: char = '.';

/// The three raw segments of a token, before any decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub encoded_locator: String,
    pub expires_at: String,
    pub signature: String,
}

impl Token {
    /// Split a token into exactly three segments.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split(DELIMITER);
        let encoded_locator = parts.next()?;
        let expires_at = parts.next()?;
        let signature = parts.next()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self {
            encoded_locator: encoded_locator.to_string(),
            expires_at: expires_at.to_string(),
            signature: signature.to_string(),
        })
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{DELIMITER}{}{DELIMITER}{}",
            self.encoded_locator, self.expires_at, self.signature
        )
    }
}
