use std::fmt;

use gitkv_types::ObjectId;
use serde::{Deserialize, Serialize};

use crate::names::qualify;

/// What a ref must point at for an update to apply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Precondition {
    /// No check (a forced update).
    Any,
    /// The ref must not exist.
    Absent,
    /// The ref must currently point at this object.
    Equals(ObjectId),
}

impl Precondition {
    pub fn holds(&self, current: Option<ObjectId>) -> bool {
        match self {
            Self::Any => true,
            Self::Absent => current.is_none(),
            Self::Equals(expected) => current == Some(*expected),
        }
    }

    /// Old-value form used by git hosts: absent check is the zero id,
    /// no check is omitted.
    pub fn to_wire(&self) -> Option<ObjectId> {
        match self {
            Self::Any => None,
            Self::Absent => Some(ObjectId::zero()),
            Self::Equals(id) => Some(*id),
        }
    }
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("anything"),
            Self::Absent => f.write_str("no ref"),
            Self::Equals(id) => write!(f, "{id}"),
        }
    }
}

/// One operation of an atomic ref batch.
///
/// `after: None` deletes the ref.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefUpdate {
    pub name: String,
    pub before: Precondition,
    pub after: Option<ObjectId>,
}

impl RefUpdate {
    /// Point `name` at `after` whatever it holds now.
    pub fn force(name: impl Into<String>, after: ObjectId) -> Self {
        Self {
            name: name.into(),
            before: Precondition::Any,
            after: Some(after),
        }
    }

    /// Create `name`, failing if it already exists.
    pub fn create(name: impl Into<String>, after: ObjectId) -> Self {
        Self {
            name: name.into(),
            before: Precondition::Absent,
            after: Some(after),
        }
    }

    /// Move `name` from `expected` to `after`.
    pub fn compare_and_swap(name: impl Into<String>, expected: ObjectId, after: ObjectId) -> Self {
        Self {
            name: name.into(),
            before: Precondition::Equals(expected),
            after: Some(after),
        }
    }

    /// Delete `name` unconditionally.
    pub fn delete(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            before: Precondition::Any,
            after: None,
        }
    }

    /// The new target in wire form: deletion is the zero id.
    pub fn after_wire(&self) -> ObjectId {
        self.after.unwrap_or_else(ObjectId::zero)
    }

    /// The same update with its name fully qualified.
    pub fn qualified(&self) -> Self {
        Self {
            name: qualify(&self.name),
            ..self.clone()
        }
    }
}

/// A committed batch, as recorded by the in-memory store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefTransaction {
    pub sequence: u64,
    pub updates: Vec<RefUpdate>,
}
