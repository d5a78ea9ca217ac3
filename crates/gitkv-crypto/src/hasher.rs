use gitkv_types::ObjectId;
use sha1::{Digest, Sha1};

/// Git object hasher.
///
/// Each hasher carries an object kind (`blob`, `tree`, `commit`, `tag`).
/// The digest is SHA-1 over the header `"{kind} {len}\0"` followed by the
/// content, exactly as git computes object ids. Equal bytes under different
/// kinds therefore hash differently.
pub struct ContentHasher {
    kind: &'static str,
}

impl ContentHasher {
    /// Hasher for blob objects.
    pub const BLOB: Self = Self { kind: "blob" };
    /// Hasher for tree objects.
    pub const TREE: Self = Self { kind: "tree" };
    /// Hasher for commit objects.
    pub const COMMIT: Self = Self { kind: "commit" };
    /// Hasher for annotated tag objects.
    pub const TAG: Self = Self { kind: "tag" };

    /// The header git prepends before hashing `len` bytes of content.
    pub fn header(&self, len: usize) -> Vec<u8> {
        format!("{} {}\0", self.kind, len).into_bytes()
    }

    /// Compute the object id of `data`.
    pub fn hash(&self, data: &[u8]) -> ObjectId {
        let mut hasher = Sha1::new();
        hasher.update(self.header(data.len()));
        hasher.update(data);
        ObjectId::from_hash(hasher.finalize().into())
    }

    /// The object kind used in the header.
    pub fn kind(&self) -> &str {
        self.kind
    }
}
