//! Locator codec.
//!
//! Locators are carried as unpadded base64url, whose alphabet
//! (`A-Z a-z 0-9 - _`) never contains the token delimiter.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use thiserror::Error;

/// Failure to turn a token segment back into a locator.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("segment is empty")]
    Empty,
    #[error("segment is not valid base64url: {0}")]
    Base64(String),
    #[error("decoded locator is not UTF-8")]
    Utf8,
}

/// Encode a locator into a token-safe segment.
pub fn encode(locator: &str) -> String {
    URL_SAFE_NO_PAD.encode(locator.as_bytes())
}

/// Decode a segment produced by [`encode`].
///
/// Rejects padding, characters outside the alphabet and non-canonical
/// trailing bits, so every accepted segment has exactly one preimage.
pub fn decode(segment: &str) -> Result<String, CodecError> {
    if segment.is_empty() {
        return Err(CodecError::Empty);
    }
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| CodecError::Base64(e.to_string()))?;
    String::from_utf8(bytes).map_err(|_| CodecError::Utf8)
}
