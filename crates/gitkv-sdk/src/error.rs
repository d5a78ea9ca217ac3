use gitkv_remote::RemoteError;
use gitkv_types::{KeyId, TypeError, TypeTag};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KvError {
    #[error("Key exists: {0}")]
    KeyExists(KeyId),

    /// The value changed between read and write.
    #[error("update conflict on {0}: value changed concurrently")]
    Conflict(KeyId),

    #[error("key not found: {0}")]
    NotFound(KeyId),

    #[error("type mismatch: expected {expected}, found {actual}")]
    TypeMismatch { expected: TypeTag, actual: TypeTag },

    /// Refs of a key disagree with the stored objects.
    #[error("corrupt entry: {0}")]
    Corrupt(String),

    #[error("type error: {0}")]
    Type(#[from] TypeError),

    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),
}

pub type KvResult<T> = Result<T, KvError>;
