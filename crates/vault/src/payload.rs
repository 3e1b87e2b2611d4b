//! Encrypted payload text format: `b64(salt).b64(nonce).b64(ciphertext||tag)`

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use swap_core::VaultError;

use crate::kdf::SALT_LEN;

pub const NONCE_LEN: usize = 12;
/// AES-GCM authentication tag length
pub const TAG_LEN: usize = 16;
/// Not part of the base64 alphabet
pub const SEPARATOR: char = '.';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPayload {
    pub salt: [u8; SALT_LEN],
    pub nonce: [u8; NONCE_LEN],
    /// Ciphertext with the tag appended
    pub ciphertext: Vec<u8>,
}

impl EncryptedPayload {
    pub fn encode(&self) -> String {
        [
            STANDARD.encode(self.salt),
            STANDARD.encode(self.nonce),
            STANDARD.encode(&self.ciphertext),
        ]
        .join(".")
    }

    pub fn parse(text: &str) -> Result<Self, VaultError> {
        let segments: Vec<&str> = text.trim().split(SEPARATOR).collect();
        if segments.len() != 3 {
            return Err(VaultError::MalformedPayload(format!(
                "expected 3 segments, found {}",
                segments.len()
            )));
        }

        let salt = decode_fixed::<SALT_LEN>("salt", segments[0])?;
        let nonce = decode_fixed::<NONCE_LEN>("nonce", segments[1])?;
        let ciphertext = decode_segment("ciphertext", segments[2])?;
        if ciphertext.len() < TAG_LEN {
            return Err(VaultError::MalformedPayload(
                "ciphertext shorter than authentication tag".to_string(),
            ));
        }

        Ok(Self { salt, nonce, ciphertext })
    }
}

impl fmt::Display for EncryptedPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for EncryptedPayload {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn decode_segment(name: &str, segment: &str) -> Result<Vec<u8>, VaultError> {
    STANDARD
        .decode(segment)
        .map_err(|e| VaultError::MalformedPayload(format!("{} is not valid base64: {}", name, e)))
}

fn decode_fixed<const N: usize>(name: &str, segment: &str) -> Result<[u8; N], VaultError> {
    let bytes = decode_segment(name, segment)?;
    bytes.try_into().map_err(|bytes: Vec<u8>| {
        VaultError::MalformedPayload(format!("{} must be {} bytes, got {}", name, N, bytes.len()))
    })
}
