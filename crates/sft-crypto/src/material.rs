//! Key material: the per-operation secret everything else derives from

use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use sft_core::{SftError, SftResult};

use crate::KEY_MATERIAL_SIZE;

/// Bytes of fresh randomness folded into each generated secret
const RANDOM_SEED_SIZE: usize = 16;

/// A 256-bit opaque secret, freshly generated per encryption operation and
/// never reused. Zeroized on drop.
#[derive(Clone)]
pub struct KeyMaterial {
    bytes: [u8; KEY_MATERIAL_SIZE],
}

impl KeyMaterial {
    pub fn from_bytes(bytes: [u8; KEY_MATERIAL_SIZE]) -> Self {
        Self { bytes }
    }

    /// Construct from untrusted bytes (a decoded secret). Anything but
    /// exactly [`KEY_MATERIAL_SIZE`] bytes fails here, before any
    /// derivation is attempted.
    pub fn from_slice(slice: &[u8]) -> SftResult<Self> {
        if slice.len() != KEY_MATERIAL_SIZE {
            return Err(SftError::Input(format!(
                "key material has wrong size: {} bytes (expected {})",
                slice.len(),
                KEY_MATERIAL_SIZE
            )));
        }
        let mut bytes = [0u8; KEY_MATERIAL_SIZE];
        bytes.copy_from_slice(slice);
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; KEY_MATERIAL_SIZE] {
        &self.bytes
    }
}

impl Drop for KeyMaterial {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Generate fresh key material for one encryption operation.
///
/// `SHA-256(plaintext)` and `SHA-256(16 fresh random bytes)` are each
/// computed, then concatenated and digested again. The secret is thereby
/// bound to both the content and the entropy: neither alone fixes the key.
pub fn generate_key_material(plaintext: &[u8]) -> KeyMaterial {
    let plain_hash = Sha256::digest(plaintext);

    let mut seed = [0u8; RANDOM_SEED_SIZE];
    rand::thread_rng().fill_bytes(&mut seed);
    let seed_hash = Sha256::digest(seed);

    let mut outer = Sha256::new();
    outer.update(plain_hash);
    outer.update(seed_hash);
    KeyMaterial::from_bytes(outer.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_is_never_repeated() {
        // Same plaintext, but the random seed makes each secret unique.
        let m1 = generate_key_material(b"same input");
        let m2 = generate_key_material(b"same input");
        assert_ne!(m1.as_bytes(), m2.as_bytes());
    }

    #[test]
    fn from_slice_rejects_wrong_sizes() {
        assert!(KeyMaterial::from_slice(&[0u8; 31]).is_err());
        assert!(KeyMaterial::from_slice(&[0u8; 33]).is_err());
        assert!(KeyMaterial::from_slice(&[]).is_err());
        assert!(KeyMaterial::from_slice(&[0u8; 32]).is_ok());
    }

    #[test]
    fn undersized_material_is_an_input_error() {
        match KeyMaterial::from_slice(&[0u8; 16]) {
            Err(SftError::Input(_)) => {}
            other => panic!("expected input error, got {other:?}"),
        }
    }

    #[test]
    fn debug_does_not_leak_bytes() {
        let material = generate_key_material(b"secret");
        let rendered = format!("{material:?}");
        assert!(rendered.contains("REDACTED"));
    }
}
