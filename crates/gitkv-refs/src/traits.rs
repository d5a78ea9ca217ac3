//! The [`RefStore`] trait: storage interface for refs.

use gitkv_types::ObjectId;

use crate::error::Result;
use crate::types::RefUpdate;

/// Storage backend for refs.
///
/// Refs map fully qualified names to object ids. The only way to mutate them
/// is [`RefStore::apply`], which is all-or-nothing.
pub trait RefStore: Send + Sync {
    /// Read a ref by name. Returns `Ok(None)` if it does not exist.
    fn read_ref(&self, name: &str) -> Result<Option<ObjectId>>;

    /// Apply a batch atomically.
    ///
    /// Every precondition is checked against the state before the batch; if
    /// any fails, nothing is applied and [`crate::RefError::Conflict`] names
    /// the first failing ref.
    fn apply(&self, updates: &[RefUpdate]) -> Result<()>;

    /// List refs whose name starts with `prefix`, sorted by name.
    fn list_refs(&self, prefix: &str) -> Result<Vec<(String, ObjectId)>>;
}
