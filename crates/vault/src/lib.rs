//! Passphrase-based custody of raw key material
//!
//! - PBKDF2-HMAC-SHA512 key derivation (200k iterations)
//! - AES-256-GCM authenticated encryption
//! - `salt.nonce.ciphertext` base64 text payloads

pub mod kdf;
pub mod payload;
pub mod vault;

pub use kdf::{derive_key, PBKDF2_ITERATIONS};
pub use payload::EncryptedPayload;
pub use vault::{decrypt_with, encrypt_with, KeyVault};
