use thiserror::Error;

/// Errors from cryptographic operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Decryption failed: wrong key, tampered ciphertext or truncated input.
    #[error("authentication failure: {0}")]
    Authentication(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),
}

/// Result alias for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;
