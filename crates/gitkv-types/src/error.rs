use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid base64 string: {0}")]
    InvalidBase64(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    #[error("invalid key id: {0}")]
    InvalidKeyId(String),

    #[error("cannot decode {tag} value: {reason}")]
    Decode { tag: String, reason: String },

    #[error("Breaking bijection: {0}")]
    BreakingBijection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result alias for type operations.
pub type TypeResult<T> = Result<T, TypeError>;
