//! AES-256-GCM payload cipher with content-derived IVs.
//!
//! The IV is `SHA-256(iv_material(plaintext))`, a 32-byte GCM nonce. With
//! [`IvSource::Deterministic`] the material is `password ‖ salt ‖ plaintext`,
//! so encryption is a pure function of key and plaintext and equal payloads
//! still deduplicate under ciphertext. The secret salt keeps outsiders from
//! reproducing a ciphertext for a guessed plaintext.
//!
//! Wire format: `iv (32 bytes) ‖ ciphertext ‖ tag (16 bytes)`.

use std::fmt;
use std::sync::Arc;

use aes_gcm::aead::consts::U32;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Nonce};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::digest::derive_key;
use crate::error::{CryptoError, CryptoResult};

/// IV length in bytes.
pub const IV_LEN: usize = 32;
/// GCM authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

type Aes256Gcm32 = AesGcm<Aes256, U32>;

/// Symmetric encryption of stored payloads.
pub trait PayloadCipher: Send + Sync {
    fn encrypt(&self, plaintext: &[u8]) -> CryptoResult<Vec<u8>>;

    /// Fails with [`CryptoError::Authentication`] rather than returning garbage.
    fn decrypt(&self, data: &[u8]) -> CryptoResult<Vec<u8>>;
}

/// Where the bytes hashed into the IV come from.
#[derive(Clone)]
pub enum IvSource {
    /// 32 fresh random bytes per call. Defeats deduplication.
    Random,
    /// `prefix ‖ plaintext`.
    Deterministic { prefix: Vec<u8> },
    Custom(Arc<dyn Fn(&[u8]) -> Vec<u8> + Send + Sync>),
}

impl IvSource {
    fn material(&self, plaintext: &[u8]) -> Vec<u8> {
        match self {
            Self::Random => {
                let mut bytes = vec![0u8; IV_LEN];
                rand::thread_rng().fill_bytes(&mut bytes);
                bytes
            }
            Self::Deterministic { prefix } => [prefix.as_slice(), plaintext].concat(),
            Self::Custom(f) => f(plaintext),
        }
    }
}

impl fmt::Debug for IvSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Random => f.write_str("Random"),
            Self::Deterministic { .. } => f.write_str("Deterministic"),
            Self::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// AES-256-GCM codec keyed by PBKDF2.
pub struct Codec {
    cipher: Aes256Gcm32,
    iv_source: IvSource,
}

impl Codec {
    /// Derive the key from `password` and `salt`.
    pub fn new(password: &str, salt: &[u8], iv_source: IvSource) -> Self {
        Self::from_key(derive_key(password, salt), iv_source)
    }

    /// Deduplicating codec: IV material is `password ‖ salt ‖ plaintext`.
    pub fn deterministic(password: &str, salt: &[u8]) -> Self {
        let prefix = [password.as_bytes(), salt].concat();
        Self::new(password, salt, IvSource::Deterministic { prefix })
    }

    /// Use an already-derived 256-bit key.
    pub fn from_key(key: [u8; 32], iv_source: IvSource) -> Self {
        Self {
            cipher: Aes256Gcm32::new(GenericArray::from_slice(&key)),
            iv_source,
        }
    }

    pub fn iv_source(&self) -> &IvSource {
        &self.iv_source
    }
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec")
            .field("iv_source", &self.iv_source)
            .finish_non_exhaustive()
    }
}

impl PayloadCipher for Codec {
    fn encrypt(&self, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        let iv: [u8; IV_LEN] = Sha256::digest(self.iv_source.material(plaintext)).into();
        let sealed = self
            .cipher
            .encrypt(Nonce::<U32>::from_slice(&iv), plaintext)
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;
        let mut out = Vec::with_capacity(IV_LEN + sealed.len());
        out.extend_from_slice(&iv);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    fn decrypt(&self, data: &[u8]) -> CryptoResult<Vec<u8>> {
        if data.len() < IV_LEN + TAG_LEN {
            return Err(CryptoError::Authentication(format!(
                "ciphertext of {} bytes is shorter than iv and tag",
                data.len()
            )));
        }
        let (iv, sealed) = data.split_at(IV_LEN);
        self.cipher
            .decrypt(Nonce::<U32>::from_slice(iv), sealed)
            .map_err(|_| CryptoError::Authentication("tag mismatch".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deterministic(key_byte: u8) -> Codec {
        Codec::from_key(
            [key_byte; 32],
            IvSource::Deterministic {
                prefix: b"Secret keysalt".to_vec(),
            },
        )
    }

    #[test]
    fn roundtrip() {
        let codec = deterministic(7);
        let sealed = codec.encrypt(b"hello").unwrap();
        assert_eq!(sealed.len(), IV_LEN + 5 + TAG_LEN);
        assert_eq!(codec.decrypt(&sealed).unwrap(), b"hello");
    }

    #[test]
    fn iv_is_sha256_of_material() {
        let codec = deterministic(7);
        let sealed = codec.encrypt(b"payload").unwrap();
        let expected: [u8; 32] = Sha256::digest(b"Secret keysaltpayload").into();
        assert_eq!(&sealed[..IV_LEN], &expected);
    }

    #[test]
    fn deterministic_mode_is_pure() {
        let codec = deterministic(7);
        assert_eq!(codec.encrypt(b"same").unwrap(), codec.encrypt(b"same").unwrap());
        assert_ne!(codec.encrypt(b"same").unwrap(), codec.encrypt(b"other").unwrap());
    }

    #[test]
    fn random_mode_varies() {
        let codec = Codec::from_key([1; 32], IvSource::Random);
        let a = codec.encrypt(b"same").unwrap();
        let b = codec.encrypt(b"same").unwrap();
        assert_ne!(a, b);
        assert_eq!(codec.decrypt(&a).unwrap(), b"same");
    }

    #[test]
    fn custom_source_is_used() {
        let codec = Codec::from_key([2; 32], IvSource::Custom(Arc::new(|_| b"fixed".to_vec())));
        let sealed = codec.encrypt(b"x").unwrap();
        let expected: [u8; 32] = Sha256::digest(b"fixed").into();
        assert_eq!(&sealed[..IV_LEN], &expected);
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let sealed = deterministic(7).encrypt(b"secret").unwrap();
        let err = deterministic(8).decrypt(&sealed).unwrap_err();
        assert!(matches!(err, CryptoError::Authentication(_)));
    }

    #[test]
    fn tampered_ciphertext_fails_authentication() {
        let codec = deterministic(7);
        let mut sealed = codec.encrypt(b"secret").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        assert!(matches!(codec.decrypt(&sealed), Err(CryptoError::Authentication(_))));
    }

    #[test]
    fn short_input_fails_authentication() {
        let codec = deterministic(7);
        assert!(matches!(codec.decrypt(&[0u8; 40]), Err(CryptoError::Authentication(_))));
    }

    #[test]
    fn password_codecs_agree() {
        let a = Codec::deterministic("Secret key", b"0123456789ab");
        let b = Codec::deterministic("Secret key", b"0123456789ab");
        let sealed = a.encrypt(b"shared").unwrap();
        assert_eq!(sealed, b.encrypt(b"shared").unwrap());
        assert_eq!(b.decrypt(&sealed).unwrap(), b"shared");
    }
}
