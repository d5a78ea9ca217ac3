use std::collections::BTreeMap;

use gitkv_remote::LinkKind;
use gitkv_types::{KeyId, ObjectId, TypeTag, TypedValue};
use serde::Serialize;

/// The content-derived identity of a key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct KeyIdentity {
    pub id: KeyId,
}

impl KeyIdentity {
    pub fn tag(&self) -> TypeTag {
        self.id.tag
    }

    /// Commit holding the key's own serialized bytes.
    pub fn commit(&self) -> ObjectId {
        self.id.commit
    }

    /// `{TypeName}/{base64url(commit)}`
    pub fn uuid(&self) -> String {
        self.id.to_string()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CreateOptions {
    /// Replace an existing entry instead of failing with `KeyExists`.
    pub overwrite: bool,
}

impl CreateOptions {
    pub fn overwrite() -> Self {
        Self { overwrite: true }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CreateOutcome {
    pub id: KeyId,
    /// Public URLs of the stored value. Empty for private or encrypted
    /// databases.
    pub links: BTreeMap<LinkKind, String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UpdateOutcome {
    pub old_value: TypedValue,
    pub new_value: TypedValue,
    pub links: BTreeMap<LinkKind, String>,
}

/// A value together with the commit it was read from.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Snapshot {
    pub value: TypedValue,
    pub commit: ObjectId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_accessors() {
        let commit = ObjectId::from_hash([7; 20]);
        let identity = KeyIdentity {
            id: KeyId::new(TypeTag::Number, commit),
        };
        assert_eq!(identity.tag(), TypeTag::Number);
        assert_eq!(identity.commit(), commit);
        assert!(identity.uuid().starts_with("Number/"));
    }

    #[test]
    fn create_options_default_to_no_overwrite() {
        assert!(!CreateOptions::default().overwrite);
        assert!(CreateOptions::overwrite().overwrite);
    }

    #[test]
    fn outcome_serializes_link_kinds_by_name() {
        let outcome = CreateOutcome {
            id: KeyId::new(TypeTag::String, ObjectId::from_hash([1; 20])),
            links: BTreeMap::from([(LinkKind::OctetStream, "https://cdn/x/value".to_string())]),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["links"]["octet-stream"], "https://cdn/x/value");
    }
}
