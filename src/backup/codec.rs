//! Reversible text encoding for snapshot payloads
//!
//! Encoded payloads are the UTF-8 bytes of the serialized domains mapping in
//! standard base64. This is not compression; it keeps the payload opaque and
//! ASCII-only so it survives any text store.

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::error::{VaultError, VaultResult};

use super::snapshot::Domains;

/// Encode arbitrary text
pub fn encode(text: &str) -> String {
    STANDARD.encode(text.as_bytes())
}

/// Invert `encode`
pub fn decode(encoded: &str) -> VaultResult<String> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| VaultError::CorruptPayload(format!("Payload is not valid base64: {}", e)))?;

    String::from_utf8(bytes)
        .map_err(|e| VaultError::CorruptPayload(format!("Payload is not valid UTF-8: {}", e)))
}

/// Serialize and encode a domains mapping
pub fn encode_domains(domains: &Domains) -> VaultResult<String> {
    let json = serde_json::to_string(domains)?;
    Ok(encode(&json))
}

/// Decode and parse a domains mapping
pub fn decode_domains(encoded: &str) -> VaultResult<Domains> {
    let json = decode(encoded)?;
    serde_json::from_str(&json).map_err(|e| {
        VaultError::CorruptPayload(format!("Decoded payload is not a domains mapping: {}", e))
    })
}
