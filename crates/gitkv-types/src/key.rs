use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::object::ObjectId;
use crate::tag::TypeTag;

/// Identifier of a stored key: `{tag}/{base64url(commit)}`.
///
/// `commit` is the content hash of the key's own serialized bytes, so equal
/// keys yield equal ids in every process without any lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyId {
    pub tag: TypeTag,
    pub commit: ObjectId,
}

impl KeyId {
    pub fn new(tag: TypeTag, commit: ObjectId) -> Self {
        Self { tag, commit }
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.tag, self.commit.to_base64url())
    }
}

impl FromStr for KeyId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (tag, encoded) = s
            .split_once('/')
            .ok_or_else(|| TypeError::InvalidKeyId(s.to_string()))?;
        Ok(Self {
            tag: tag.parse()?,
            commit: ObjectId::from_base64url(encoded)?,
        })
    }
}
