//! Base64 helpers for transaction payloads.
//!
//! Swap transactions arrive and leave the gateway as standard (padded)
//! base64 strings; this module pins the alphabet in one place.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as b64;

/// Decodes a standard base64 string into raw bytes.
///
/// # Errors
///
/// Returns the underlying decode error if `input` is not valid base64.
pub fn decode(input: &str) -> Result<Vec<u8>, base64::DecodeError> {
    b64.decode(input)
}

/// Encodes raw bytes as a standard base64 string.
pub fn encode<T: AsRef<[u8]>>(input: T) -> String {
    b64.encode(input.as_ref())
}
