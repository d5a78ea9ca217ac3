use gitkv_crypto::CryptoError;
use gitkv_refs::RefError;
use gitkv_store::StoreError;
use gitkv_types::{ObjectId, TypeError};
use thiserror::Error;

/// Errors from talking to the backing store.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The platform answered with an unexpected status.
    #[error("{context} failed with status {status}: {message}")]
    Status {
        context: String,
        status: u16,
        message: String,
    },

    #[error("graphql error: {0}")]
    GraphQl(String),

    /// The platform refused a ref batch, typically a failed precondition.
    #[error("ref update rejected: {0}")]
    RefRejected(String),

    #[error("store not provisioned: {0}. Run init workflow in the GitHub repo first!")]
    NotProvisioned(String),

    /// Every mirror failed with something other than a 404.
    #[error("all mirrors failed for {commit}: {details}")]
    MirrorsExhausted { commit: ObjectId, details: String },

    /// The platform computed a different id than the offline hash.
    #[error("content hash mismatch: expected {expected}, remote returned {actual}")]
    HashMismatch { expected: ObjectId, actual: ObjectId },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("ref error: {0}")]
    Ref(#[from] RefError),

    #[error("type error: {0}")]
    Type(#[from] TypeError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("base64 error: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl RemoteError {
    /// Whether a ref batch was refused because a precondition did not hold.
    pub fn is_ref_rejection(&self) -> bool {
        matches!(
            self,
            Self::RefRejected(_) | Self::Ref(RefError::Conflict { .. })
        )
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;
