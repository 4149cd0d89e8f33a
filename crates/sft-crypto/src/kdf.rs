//! Deterministic expansion of key material into an AES key and GCM nonce

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

use sft_core::{SftError, SftResult};

use crate::material::KeyMaterial;
use crate::{KEY_SIZE, NONCE_SIZE};

/// Context label for the encryption-key expansion (wire constant)
const KEY_INFO: &[u8] = b"fileEncryptionKey";

/// Context label for the nonce expansion (wire constant)
const NONCE_INFO: &[u8] = b"iv";

/// Fixed zero salt. Derivation must be a pure function of the key material
/// so that decryption can be reconstructed from the transmitted secret
/// alone, with no side channel.
const SALT: [u8; 8] = [0u8; 8];

/// The (encryption key, nonce) pair derived from one [`KeyMaterial`].
///
/// Zeroized on drop.
pub struct DerivedKeys {
    key: [u8; KEY_SIZE],
    nonce: [u8; NONCE_SIZE],
}

impl DerivedKeys {
    pub fn key(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }

    pub fn nonce(&self) -> &[u8; NONCE_SIZE] {
        &self.nonce
    }
}

impl Drop for DerivedKeys {
    fn drop(&mut self) {
        self.key.zeroize();
        self.nonce.zeroize();
    }
}

impl std::fmt::Debug for DerivedKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKeys")
            .field("key", &"[REDACTED]")
            .field("nonce", &"[REDACTED]")
            .finish()
    }
}

/// Derive the AES-256 key and GCM nonce from key material via two
/// independent HKDF-SHA256 expansions with distinct context labels.
///
/// Same input always yields the same output.
pub fn derive_keys(material: &KeyMaterial) -> SftResult<DerivedKeys> {
    let mut key = [0u8; KEY_SIZE];
    Hkdf::<Sha256>::new(Some(&SALT), material.as_bytes())
        .expand(KEY_INFO, &mut key)
        .map_err(|e| SftError::Crypto(format!("HKDF expand (key) failed: {e}")))?;

    let mut nonce = [0u8; NONCE_SIZE];
    Hkdf::<Sha256>::new(Some(&SALT), material.as_bytes())
        .expand(NONCE_INFO, &mut nonce)
        .map_err(|e| SftError::Crypto(format!("HKDF expand (nonce) failed: {e}")))?;

    Ok(DerivedKeys { key, nonce })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::generate_key_material;
    use crate::KEY_MATERIAL_SIZE;

    #[test]
    fn derivation_is_deterministic() {
        let material = KeyMaterial::from_bytes([7u8; KEY_MATERIAL_SIZE]);
        let a = derive_keys(&material).unwrap();
        let b = derive_keys(&material).unwrap();
        assert_eq!(a.key(), b.key());
        assert_eq!(a.nonce(), b.nonce());
    }

    #[test]
    fn distinct_material_yields_distinct_keys() {
        let a = derive_keys(&generate_key_material(b"a")).unwrap();
        let b = derive_keys(&generate_key_material(b"b")).unwrap();
        assert_ne!(a.key(), b.key());
        assert_ne!(a.nonce(), b.nonce());
    }

    #[test]
    fn key_and_nonce_expansions_are_independent() {
        let material = KeyMaterial::from_bytes([42u8; KEY_MATERIAL_SIZE]);
        let derived = derive_keys(&material).unwrap();
        // The nonce must not simply be a prefix of the key stream.
        assert_ne!(&derived.key()[..NONCE_SIZE], derived.nonce());
    }
}
