//! AES-256-GCM seal/open
//!
//! Ciphertext layout is `ciphertext || 16-byte tag` — no nonce prefix, since
//! the nonce is re-derived from the blob's key material on open. Associated
//! data is a single zero byte: a version placeholder with no semantic
//! content, required for wire compatibility.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};

use sft_core::{SftError, SftResult};

use crate::kdf::{derive_keys, DerivedKeys};
use crate::material::{generate_key_material, KeyMaterial};

const ASSOCIATED_DATA: [u8; 1] = [0u8];

/// Seal `plaintext` under an already-derived key/nonce pair.
pub fn seal(plaintext: &[u8], keys: &DerivedKeys) -> SftResult<Vec<u8>> {
    let cipher = Aes256Gcm::new(keys.key().into());
    cipher
        .encrypt(
            Nonce::from_slice(keys.nonce()),
            Payload {
                msg: plaintext,
                aad: &ASSOCIATED_DATA,
            },
        )
        .map_err(|e| SftError::Crypto(format!("seal failed: {e}")))
}

/// Open a sealed blob. Fails on any tag mismatch or malformed ciphertext;
/// the failure is always fatal for this blob — never partial plaintext.
pub fn open(ciphertext: &[u8], keys: &DerivedKeys) -> SftResult<Vec<u8>> {
    let cipher = Aes256Gcm::new(keys.key().into());
    cipher
        .decrypt(
            Nonce::from_slice(keys.nonce()),
            Payload {
                msg: ciphertext,
                aad: &ASSOCIATED_DATA,
            },
        )
        .map_err(|_| {
            SftError::Crypto(
                "authentication failed: tampered ciphertext or wrong secret".to_string(),
            )
        })
}

/// Seal `plaintext` under fresh key material.
///
/// Returns the ciphertext and the material it was sealed under; the caller
/// transmits only the material's encoded form and discards the rest.
pub fn seal_with_fresh_material(plaintext: &[u8]) -> SftResult<(Vec<u8>, KeyMaterial)> {
    let material = generate_key_material(plaintext);
    let keys = derive_keys(&material)?;
    let ciphertext = seal(plaintext, &keys)?;
    Ok((ciphertext, material))
}

/// Derive keys from `material` and open `ciphertext` with them.
pub fn open_with_material(ciphertext: &[u8], material: &KeyMaterial) -> SftResult<Vec<u8>> {
    let keys = derive_keys(material)?;
    open(ciphertext, &keys)
}
