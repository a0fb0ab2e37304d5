//! Cryptographic Digests
//!
//! SHA-256 fingerprints of update content, rendered in the two encodings the
//! rest of the system relies on: lowercase hex (cache keys, record ids) and
//! URL-safe base64 (the lookup key format the remote CDN expects).

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};

/// Length of a hex-encoded SHA-256 digest.
pub const DIGEST_HEX_LEN: usize = 64;

/// SHA-256 of `bytes` as lowercase hex (64 chars). Pure and total.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// SHA-256 of `bytes`, base64-encoded with `=` padding stripped and the
/// URL-safe alphabet substitution applied (RFC 4648 section 5).
pub fn sha256_base64_url(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(bytes))
}

/// Decode a hex-encoded digest back to raw bytes.
///
/// Returns `None` if the input is not 64 hex characters.
pub fn decode_hex_digest(digest_hex: &str) -> Option<[u8; 32]> {
    if digest_hex.len() != DIGEST_HEX_LEN {
        return None;
    }
    let raw = hex::decode(digest_hex).ok()?;
    raw.try_into().ok()
}

/// Decode a URL-safe base64 digest back to raw bytes, accepting either the
/// padded standard alphabet or the unpadded URL-safe one.
pub fn decode_base64_url_digest(digest_b64: &str) -> Option<[u8; 32]> {
    let raw = URL_SAFE_NO_PAD
        .decode(digest_b64)
        .or_else(|_| STANDARD.decode(digest_b64))
        .ok()?;
    raw.try_into().ok()
}

/// Check that `digest_hex` is a well-formed lowercase hex digest.
pub fn is_valid_hex_digest(digest_hex: &str) -> bool {
    digest_hex.len() == DIGEST_HEX_LEN
        && digest_hex
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
