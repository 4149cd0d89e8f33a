//! URL-safe secret tokens
//!
//! A secret is raw key material, base64url-encoded, with every padding `=`
//! substituted by `.` so the token needs no percent-escaping when embedded
//! in a URL fragment or a JSON string.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;

use sft_core::{SftError, SftResult};

use crate::material::KeyMaterial;

/// Render key material as a URL-safe token.
pub fn encode_secret(material: &KeyMaterial) -> String {
    URL_SAFE.encode(material.as_bytes()).replace('=', ".")
}

/// Parse a token back into key material.
///
/// Any failure — wrong length, invalid characters, altered padding — is a
/// fatal input error, raised before the secret is used for anything.
pub fn decode_secret(token: &str) -> SftResult<KeyMaterial> {
    let padded = token.replace('.', "=");
    let raw = URL_SAFE
        .decode(padded.as_bytes())
        .map_err(|e| SftError::Input(format!("malformed secret: {e}")))?;
    KeyMaterial::from_slice(&raw)
}
