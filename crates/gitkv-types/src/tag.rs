use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::bimap::BiMap;
use crate::error::{TypeError, TypeResult};
use crate::object::ObjectId;

/// The kind of a stored key or value.
///
/// Each tag is bound to a fixed commit that was created when the remote
/// repository was provisioned. A key's `value/type` ref points at that commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TypeTag {
    Number,
    Boolean,
    String,
    Json,
    /// Binary payload with a MIME type.
    Blob,
    /// Raw bytes.
    Bytes,
}

impl TypeTag {
    pub const ALL: [TypeTag; 6] = [
        TypeTag::Number,
        TypeTag::Boolean,
        TypeTag::String,
        TypeTag::Json,
        TypeTag::Blob,
        TypeTag::Bytes,
    ];

    /// Name used in ref paths and key ids.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Number => "Number",
            Self::Boolean => "Boolean",
            Self::String => "String",
            Self::Json => "JSON",
            Self::Blob => "Blob",
            Self::Bytes => "ArrayBuffer",
        }
    }

    /// The well-known commit this tag is provisioned at.
    pub const fn commit_id(&self) -> ObjectId {
        match self {
            Self::Number => ObjectId::from_hex_literal("14f91166da82bb4c61d208ac02c492355e8d2cc2"),
            Self::Boolean => ObjectId::from_hex_literal("6e3272db79ec82e0caee4729c2b7f7e90e1900d8"),
            Self::String => ObjectId::from_hex_literal("297f8811f388d4789333d7f2377519c145c4f874"),
            Self::Json => ObjectId::from_hex_literal("f8f3eae1d21b150f5d020b65afd1cb6c07f11ab1"),
            Self::Blob => ObjectId::from_hex_literal("844f74f26e3a8afe7ff86d5870f40d2a3b926d3a"),
            Self::Bytes => ObjectId::from_hex_literal("dcb0f2b8e11c35744b4cde31041517805fae7fed"),
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TypeTag {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tag| tag.name() == s)
            .ok_or_else(|| TypeError::UnsupportedType(s.to_string()))
    }
}

/// Exact two-way lookup between tags and their provisioned commits.
#[derive(Clone, Debug)]
pub struct TypeRegistry {
    tags: BiMap<TypeTag, ObjectId>,
}

impl TypeRegistry {
    /// Registry of the six well-known tags.
    pub fn well_known() -> TypeResult<Self> {
        Self::from_pairs(TypeTag::ALL.map(|tag| (tag, tag.commit_id())))
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (TypeTag, ObjectId)>) -> TypeResult<Self> {
        Ok(Self {
            tags: BiMap::from_pairs(pairs)?,
        })
    }

    pub fn commit_of(&self, tag: TypeTag) -> Option<ObjectId> {
        self.tags.get_by_left(&tag).copied()
    }

    /// Map a commit back to its tag. Unknown commits are an error, never a guess.
    pub fn tag_of(&self, commit: &ObjectId) -> TypeResult<TypeTag> {
        self.tags
            .get_by_right(commit)
            .copied()
            .ok_or_else(|| TypeError::UnsupportedType(format!("commit {commit}")))
    }
}
