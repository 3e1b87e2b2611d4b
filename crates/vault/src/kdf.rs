//! Passphrase key derivation

use pbkdf2::pbkdf2_hmac;
use sha2::Sha512;
use zeroize::Zeroizing;

pub const SALT_LEN: usize = 16;
pub const KEY_LEN: usize = 32;
pub const PBKDF2_ITERATIONS: u32 = 200_000;

/// Derive a 32-byte AES key from `passphrase` and `salt`.
///
/// The returned buffer is wiped when dropped.
pub fn derive_key(passphrase: &str, salt: &[u8], iterations: u32) -> Zeroizing<[u8; KEY_LEN]> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2_hmac::<Sha512>(passphrase.as_bytes(), salt, iterations, key.as_mut_slice());
    key
}
