//! Error types for reference operations.

use gitkv_types::ObjectId;
use thiserror::Error;

use crate::types::Precondition;

/// Errors that can occur during reference operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RefError {
    /// The ref name is not a valid git ref name.
    #[error("invalid ref name: {name}: {reason}")]
    InvalidRefName { name: String, reason: String },

    /// A batch precondition did not hold. Nothing in the batch was applied.
    #[error("ref {name} rejected: expected {expected}, found {}", display_target(.actual))]
    Conflict {
        name: String,
        expected: Precondition,
        actual: Option<ObjectId>,
    },

    /// A lock guarding in-memory state was poisoned by a panicking writer.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

fn display_target(target: &Option<ObjectId>) -> String {
    match target {
        Some(id) => id.to_hex(),
        None => "nothing".to_string(),
    }
}

/// Convenience type alias for ref operations.
pub type Result<T> = std::result::Result<T, RefError>;
