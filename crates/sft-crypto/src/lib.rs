//! sft-crypto: client-side encryption for the transfer service
//!
//! Pipeline (per blob — a 16 MiB file chunk or the metadata document):
//! ```text
//! plaintext
//!   → KeyMaterial = SHA-256( SHA-256(plaintext) || SHA-256(16 random bytes) )
//!   → HKDF-SHA256(KeyMaterial, zero salt, "fileEncryptionKey") = AES-256 key
//!   → HKDF-SHA256(KeyMaterial, zero salt, "iv")                = GCM nonce
//!   → AES-256-GCM seal, AAD = one zero byte
//! ```
//!
//! KeyMaterial is generated fresh per encryption operation, used once for
//! derivation, and discarded; only its URL-safe encoded form travels (inside
//! the sealed metadata for chunks, in the link fragment for the metadata
//! blob itself). Derivation is a pure function of KeyMaterial, which is what
//! lets decryption be reconstructed from a transmitted secret alone.

pub mod kdf;
pub mod material;
pub mod seal;
pub mod secret;

pub use kdf::{derive_keys, DerivedKeys};
pub use material::{generate_key_material, KeyMaterial};
pub use seal::{open, open_with_material, seal, seal_with_fresh_material};
pub use secret::{decode_secret, encode_secret};

/// Size of key material in bytes (one SHA-256 digest)
pub const KEY_MATERIAL_SIZE: usize = 32;

/// Size of the derived AES-256 key
pub const KEY_SIZE: usize = 32;

/// Size of the derived GCM nonce
pub const NONCE_SIZE: usize = 12;

/// Size of the GCM authentication tag appended to every ciphertext
pub const TAG_SIZE: usize = 16;
