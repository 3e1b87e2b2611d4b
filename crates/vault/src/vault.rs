//! Key vault: encrypt and decrypt raw key material under a passphrase

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::debug;
use zeroize::Zeroizing;

use swap_core::{Passphrase, VaultError, VaultResult};

use crate::kdf::{derive_key, PBKDF2_ITERATIONS, SALT_LEN};
use crate::payload::{EncryptedPayload, NONCE_LEN};

/// Holds the process-wide passphrase and seals/opens wallet payloads.
#[derive(Debug, Clone)]
pub struct KeyVault {
    passphrase: Passphrase,
    iterations: u32,
}

impl KeyVault {
    pub fn new(passphrase: Passphrase) -> Self {
        Self {
            passphrase,
            iterations: PBKDF2_ITERATIONS,
        }
    }

    /// Build from configuration, failing when no passphrase is set.
    pub fn from_config(passphrase: Option<&Passphrase>) -> VaultResult<Self> {
        passphrase
            .cloned()
            .map(Self::new)
            .ok_or_else(|| VaultError::Config("PRIVATE_KEY_PASSPHRASE is not set".to_string()))
    }

    /// Lower iteration counts are only meant for tests.
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations.max(1);
        self
    }

    pub fn encrypt(&self, plaintext: &str) -> VaultResult<String> {
        seal(plaintext, self.passphrase.expose(), self.iterations)
    }

    pub fn decrypt(&self, payload: &str) -> VaultResult<Zeroizing<String>> {
        open(payload, self.passphrase.expose(), self.iterations)
    }
}

/// Encrypt with an explicit passphrase and the default iteration count.
pub fn encrypt_with(plaintext: &str, passphrase: &str) -> VaultResult<String> {
    seal(plaintext, passphrase, PBKDF2_ITERATIONS)
}

/// Decrypt with an explicit passphrase and the default iteration count.
pub fn decrypt_with(payload: &str, passphrase: &str) -> VaultResult<Zeroizing<String>> {
    open(payload, passphrase, PBKDF2_ITERATIONS)
}

fn seal(plaintext: &str, passphrase: &str, iterations: u32) -> VaultResult<String> {
    if passphrase.is_empty() {
        return Err(VaultError::Config("empty passphrase".to_string()));
    }

    let mut salt = [0u8; SALT_LEN];
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut nonce);

    let key = derive_key(passphrase, &salt, iterations);
    let cipher = Aes256Gcm::new_from_slice(key.as_slice())
        .map_err(|_| VaultError::Config("derived key has the wrong length".to_string()))?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
        .map_err(|_| VaultError::Config("encryption failed".to_string()))?;

    debug!(len = ciphertext.len(), "sealed wallet payload");

    Ok(EncryptedPayload { salt, nonce, ciphertext }.encode())
}

fn open(payload: &str, passphrase: &str, iterations: u32) -> VaultResult<Zeroizing<String>> {
    if passphrase.is_empty() {
        return Err(VaultError::Config("empty passphrase".to_string()));
    }

    let payload = EncryptedPayload::parse(payload)?;
    let key = derive_key(passphrase, &payload.salt, iterations);
    let cipher = Aes256Gcm::new_from_slice(key.as_slice())
        .map_err(|_| VaultError::Config("derived key has the wrong length".to_string()))?;

    let plaintext = Zeroizing::new(
        cipher
            .decrypt(Nonce::from_slice(&payload.nonce), payload.ciphertext.as_slice())
            .map_err(|_| VaultError::Decryption)?,
    );

    let text = std::str::from_utf8(&plaintext).map_err(|_| VaultError::Decryption)?;
    Ok(Zeroizing::new(text.to_owned()))
}
