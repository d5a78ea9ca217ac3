use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::error::{CryptoError, CryptoResult};

/// PBKDF2 iteration count used by [`derive_key`].
pub const PBKDF2_ROUNDS: u32 = 100_000;

/// Digest algorithms offered by [`hash`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Sha1,
    #[default]
    Sha256,
}

/// Digest `data` with the chosen algorithm.
pub fn hash(data: &[u8], algorithm: DigestAlgorithm) -> Vec<u8> {
    match algorithm {
        DigestAlgorithm::Sha1 => Sha1::digest(data).to_vec(),
        DigestAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
    }
}

/// HMAC-SHA-256 of `data` under `key`.
pub fn hmac_sha256(data: &[u8], key: &[u8]) -> CryptoResult<[u8; 32]> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key)
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().into())
}

/// Derive a 256-bit AES key from a password with PBKDF2-HMAC-SHA-256.
pub fn derive_key(password: &str, salt: &[u8]) -> [u8; 32] {
    let mut key = [0u8; 32];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ROUNDS, &mut key);
    key
}
