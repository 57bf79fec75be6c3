//! Body Fingerprints
//!
//! Every generated document records a SHA-256 fingerprint of its rendered
//! body. Regeneration renders the stored values again and compares
//! fingerprints to tell whether the template still produces the same document.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::templates::DocumentBody;

/// Key-sorted, whitespace-free JSON.
///
/// `serde_json::Map` orders its keys, so going through `Value` sorts every
/// nested object.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(value)?;
    serde_json::to_string(&value)
}

/// Lowercase hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Fingerprint of a rendered document body, formatting included.
pub fn body_fingerprint(body: &DocumentBody) -> Result<String, serde_json::Error> {
    Ok(sha256_hex(canonical_json(body)?.as_bytes()))
}
