use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use gitkv_crypto::ContentHasher;
use gitkv_types::ObjectId;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// File names under which a value commit's tree publishes the same blob:
/// raw octets, text and JSON views.
pub const VALUE_FILE_NAMES: [&str; 3] = ["value", "value.txt", "value.json"];

/// The kind of object stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Blob,
    Tree,
    Commit,
    /// Annotated tag object.
    Tag,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
            Self::Tag => "tag",
        }
    }

    fn hasher(&self) -> ContentHasher {
        match self {
            Self::Blob => ContentHasher::BLOB,
            Self::Tree => ContentHasher::TREE,
            Self::Commit => ContentHasher::COMMIT,
            Self::Tag => ContentHasher::TAG,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blob" => Ok(Self::Blob),
            "tree" => Ok(Self::Tree),
            "commit" => Ok(Self::Commit),
            "tag" => Ok(Self::Tag),
            other => Err(format!("unknown object kind: {other}")),
        }
    }
}

/// A stored object: kind tag + encoded data + cached size.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    pub kind: ObjectKind,
    pub data: Vec<u8>,
    pub size: u64,
}

impl StoredObject {
    pub fn new(kind: ObjectKind, data: Vec<u8>) -> Self {
        let size = data.len() as u64;
        Self { kind, data, size }
    }

    /// The git object id: SHA-1 over `"{kind} {size}\0"` and the data.
    pub fn compute_id(&self) -> ObjectId {
        self.kind.hasher().hash(&self.data)
    }

    fn expect_kind(&self, kind: ObjectKind) -> StoreResult<()> {
        if self.kind != kind {
            return Err(corrupt(self, format!("expected {kind}, got {}", self.kind)));
        }
        Ok(())
    }
}

fn corrupt(obj: &StoredObject, reason: impl Into<String>) -> StoreError {
    StoreError::CorruptObject {
        id: obj.compute_id(),
        reason: reason.into(),
    }
}

// ---------------------------------------------------------------------------
// Blob
// ---------------------------------------------------------------------------

/// Raw content object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blob {
    pub data: Vec<u8>,
}

impl Blob {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn id(&self) -> ObjectId {
        ContentHasher::BLOB.hash(&self.data)
    }

    pub fn to_stored_object(&self) -> StoredObject {
        StoredObject::new(ObjectKind::Blob, self.data.clone())
    }

    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        obj.expect_kind(ObjectKind::Blob)?;
        Ok(Self {
            data: obj.data.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// File mode for a tree entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryMode {
    /// Normal file (100644).
    Regular,
    /// Executable file (100755).
    Executable,
    /// Symbolic link (120000).
    Symlink,
    /// Subtree (40000).
    Directory,
    /// Commit of another repository (160000).
    Submodule,
}

impl EntryMode {
    /// Mode string as written in tree objects. Directories carry no leading zero.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regular => "100644",
            Self::Executable => "100755",
            Self::Symlink => "120000",
            Self::Directory => "40000",
            Self::Submodule => "160000",
        }
    }

    /// Kind of the object an entry with this mode points at.
    pub fn object_kind(&self) -> ObjectKind {
        match self {
            Self::Directory => ObjectKind::Tree,
            Self::Submodule => ObjectKind::Commit,
            _ => ObjectKind::Blob,
        }
    }
}

impl fmt::Display for EntryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryMode {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "100644" => Ok(Self::Regular),
            "100755" => Ok(Self::Executable),
            "120000" => Ok(Self::Symlink),
            "40000" | "040000" => Ok(Self::Directory),
            "160000" => Ok(Self::Submodule),
            other => Err(StoreError::UnknownMode(other.to_string())),
        }
    }
}

/// A single entry in a tree object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub mode: EntryMode,
    pub name: String,
    pub object_id: ObjectId,
}

impl TreeEntry {
    pub fn new(mode: EntryMode, name: impl Into<String>, object_id: ObjectId) -> Self {
        Self {
            mode,
            name: name.into(),
            object_id,
        }
    }

    /// Git orders directories as if their names ended in `/`.
    fn sort_key(&self) -> Vec<u8> {
        let mut key = self.name.as_bytes().to_vec();
        if self.mode == EntryMode::Directory {
            key.push(b'/');
        }
        key
    }
}

impl PartialOrd for TreeEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TreeEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

/// Directory listing object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    /// Entries in git order.
    pub entries: Vec<TreeEntry>,
}

impl Tree {
    /// Create a tree, sorting entries into git order.
    pub fn new(mut entries: Vec<TreeEntry>) -> Self {
        entries.sort();
        Self { entries }
    }

    /// The tree of a value commit: `blob` under every name in [`VALUE_FILE_NAMES`].
    pub fn value_layout(blob: ObjectId) -> Self {
        Self::new(
            VALUE_FILE_NAMES
                .iter()
                .map(|name| TreeEntry::new(EntryMode::Regular, *name, blob))
                .collect(),
        )
    }

    /// Canonical encoding: `"{mode} {name}\0"` + 20 raw id bytes per entry.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for entry in &self.entries {
            out.extend_from_slice(format!("{} {}\0", entry.mode, entry.name).as_bytes());
            out.extend_from_slice(entry.object_id.as_bytes());
        }
        out
    }

    pub fn id(&self) -> ObjectId {
        ContentHasher::TREE.hash(&self.encode())
    }

    pub fn to_stored_object(&self) -> StoredObject {
        StoredObject::new(ObjectKind::Tree, self.encode())
    }

    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        obj.expect_kind(ObjectKind::Tree)?;
        let mut entries = Vec::new();
        let mut rest = obj.data.as_slice();
        while !rest.is_empty() {
            let space = rest
                .iter()
                .position(|b| *b == b' ')
                .ok_or_else(|| corrupt(obj, "entry without mode separator"))?;
            let nul = rest
                .iter()
                .position(|b| *b == 0)
                .ok_or_else(|| corrupt(obj, "entry without name terminator"))?;
            if nul < space || rest.len() < nul + 21 {
                return Err(corrupt(obj, "truncated entry"));
            }
            let mode_text = std::str::from_utf8(&rest[..space])
                .map_err(|e| corrupt(obj, e.to_string()))?;
            let name = std::str::from_utf8(&rest[space + 1..nul])
                .map_err(|e| corrupt(obj, e.to_string()))?;
            let object_id = ObjectId::from_slice(&rest[nul + 1..nul + 21])
                .map_err(|e| corrupt(obj, e.to_string()))?;
            entries.push(TreeEntry::new(mode_text.parse()?, name, object_id));
            rest = &rest[nul + 21..];
        }
        Ok(Self { entries })
    }

    /// Look up an entry by name.
    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Person
// ---------------------------------------------------------------------------

/// Author, committer or tagger.
///
/// `date` is either an RFC 3339 timestamp, rendered as `{epoch-seconds} +0000`,
/// or an already formatted git date such as `1744389816 +0530`, used verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    pub email: String,
    pub date: String,
}

impl Person {
    pub fn new(name: impl Into<String>, email: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            date: date.into(),
        }
    }

    /// The date as it appears in an object.
    pub fn git_date(&self) -> String {
        match DateTime::parse_from_rfc3339(&self.date) {
            Ok(date) => format!("{} +0000", date.timestamp()),
            Err(_) => self.date.clone(),
        }
    }

    /// `{name} <{email}> {date}`
    pub fn signature(&self) -> String {
        format!("{} <{}> {}", self.name, self.email, self.git_date())
    }

    fn parse(line: &str) -> Option<Self> {
        let open = line.find('<')?;
        let close = open + line[open..].find('>')?;
        Some(Self {
            name: line[..open].trim_end().to_string(),
            email: line[open + 1..close].to_string(),
            date: line[close + 1..].trim_start().to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Commit
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub tree: ObjectId,
    pub parents: Vec<ObjectId>,
    pub author: Person,
    pub committer: Person,
    /// Empty messages are encoded without the trailing newline.
    pub message: String,
}

impl Commit {
    /// A parentless commit authored and committed by `identity`.
    pub fn root(tree: ObjectId, identity: Person, message: impl Into<String>) -> Self {
        Self {
            tree,
            parents: Vec::new(),
            author: identity.clone(),
            committer: identity,
            message: message.into(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut text = format!("tree {}", self.tree);
        for parent in &self.parents {
            text.push_str(&format!("\nparent {parent}"));
        }
        text.push_str(&format!("\nauthor {}", self.author.signature()));
        text.push_str(&format!("\ncommitter {}", self.committer.signature()));
        text.push_str("\n\n");
        if !self.message.is_empty() {
            text.push_str(&self.message);
            text.push('\n');
        }
        text.into_bytes()
    }

    pub fn id(&self) -> ObjectId {
        ContentHasher::COMMIT.hash(&self.encode())
    }

    pub fn to_stored_object(&self) -> StoredObject {
        StoredObject::new(ObjectKind::Commit, self.encode())
    }

    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        obj.expect_kind(ObjectKind::Commit)?;
        let text = std::str::from_utf8(&obj.data).map_err(|e| corrupt(obj, e.to_string()))?;
        let (header, body) = text
            .split_once("\n\n")
            .ok_or_else(|| corrupt(obj, "missing message separator"))?;

        let mut tree = None;
        let mut parents = Vec::new();
        let mut author = None;
        let mut committer = None;
        for line in header.lines() {
            let (field, value) = line.split_once(' ').unwrap_or((line, ""));
            match field {
                "tree" => tree = ObjectId::from_hex(value).ok(),
                "parent" => parents.push(
                    ObjectId::from_hex(value).map_err(|e| corrupt(obj, e.to_string()))?,
                ),
                "author" => author = Person::parse(value),
                "committer" => committer = Person::parse(value),
                _ => {}
            }
        }

        Ok(Self {
            tree: tree.ok_or_else(|| corrupt(obj, "missing tree"))?,
            parents,
            author: author.ok_or_else(|| corrupt(obj, "missing author"))?,
            committer: committer.ok_or_else(|| corrupt(obj, "missing committer"))?,
            message: body.strip_suffix('\n').unwrap_or(body).to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// AnnotatedTag
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedTag {
    pub object: ObjectId,
    pub object_kind: ObjectKind,
    pub tag: String,
    pub tagger: Person,
    pub message: String,
}

impl AnnotatedTag {
    pub fn encode(&self) -> Vec<u8> {
        format!(
            "object {}\ntype {}\ntag {}\ntagger {}\n\n{}\n",
            self.object,
            self.object_kind,
            self.tag,
            self.tagger.signature(),
            self.message
        )
        .into_bytes()
    }

    pub fn id(&self) -> ObjectId {
        ContentHasher::TAG.hash(&self.encode())
    }

    pub fn to_stored_object(&self) -> StoredObject {
        StoredObject::new(ObjectKind::Tag, self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oid(hex: &str) -> ObjectId {
        ObjectId::from_hex(hex).unwrap()
    }

    fn somajit(date: &str) -> Person {
        Person::new(
            "Somajit Dey",
            "73181168+SomajitDey@users.noreply.github.com",
            date,
        )
    }

    #[test]
    fn blob_id_matches_git() {
        let blob = Blob::new(b"what is up, doc?".to_vec());
        assert_eq!(blob.id().to_hex(), "bd9dbf5aae1a3862dd1526723246b20206e5fc37");
        assert_eq!(blob.to_stored_object().compute_id(), blob.id());
    }

    #[test]
    fn blob_kind_mismatch() {
        let stored = StoredObject::new(ObjectKind::Tree, b"not a blob".to_vec());
        let err = Blob::from_stored_object(&stored).unwrap_err();
        assert!(matches!(err, StoreError::CorruptObject { .. }));
    }

    #[test]
    fn tree_id_matches_git() {
        let tree = Tree::new(vec![
            TreeEntry::new(EntryMode::Regular, ".gitignore", oid("c2658d7d1b31848c3b71960543cb0368e56cd4c7")),
            TreeEntry::new(EntryMode::Regular, "LICENSE", oid("ff6bd914de60ddd61b72600de4c50cafd14a16a5")),
            TreeEntry::new(EntryMode::Regular, "README.md", oid("7bedddc70e910ac884ce12f51e461b0ba9a0e1e4")),
            TreeEntry::new(EntryMode::Regular, "implementation.md", oid("7b4e7b68909921715a7e1851fe9b7f533cb045db")),
            TreeEntry::new(EntryMode::Regular, "package-lock.json", oid("d82357be0a391739abec53d01e74315b4be6e171")),
            TreeEntry::new(EntryMode::Regular, "package.json", oid("e55a9b7f8a8c6fe2810446d46594e4bfb43276b5")),
            TreeEntry::new(EntryMode::Directory, "src", oid("3107a19614d70e58c4a4b7fa8d183bc9725d5fe4")),
        ]);
        assert_eq!(tree.id().to_hex(), "6b455df2c7121a4f23578ca35cdbdf5089e35b8f");
    }

    #[test]
    fn directories_sort_with_trailing_slash() {
        let tree = Tree::new(vec![
            TreeEntry::new(EntryMode::Regular, "a.b", ObjectId::zero()),
            TreeEntry::new(EntryMode::Directory, "a", ObjectId::zero()),
            TreeEntry::new(EntryMode::Regular, "a0", ObjectId::zero()),
        ]);
        let names: Vec<_> = tree.entries.iter().map(|e| e.name.as_str()).collect();
        // "a/" sorts after "a.b" ('.' < '/') and before "a0" ('/' < '0').
        assert_eq!(names, ["a.b", "a", "a0"]);
    }

    #[test]
    fn tree_decodes_its_encoding() {
        let tree = Tree::value_layout(oid("bd9dbf5aae1a3862dd1526723246b20206e5fc37"));
        let decoded = Tree::from_stored_object(&tree.to_stored_object()).unwrap();
        assert_eq!(decoded, tree);
    }

    #[test]
    fn value_layout_publishes_three_names() {
        let blob = oid("bd9dbf5aae1a3862dd1526723246b20206e5fc37");
        let tree = Tree::value_layout(blob);
        let names: Vec<_> = tree.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["value", "value.json", "value.txt"]);
        assert!(tree.entries.iter().all(|e| e.object_id == blob && e.mode == EntryMode::Regular));
    }

    #[test]
    fn directory_mode_has_no_leading_zero() {
        assert_eq!(EntryMode::Directory.to_string(), "40000");
        assert_eq!("040000".parse::<EntryMode>().unwrap(), EntryMode::Directory);
        assert!(matches!("100600".parse::<EntryMode>(), Err(StoreError::UnknownMode(_))));
    }

    #[test]
    fn commit_id_matches_git() {
        let commit = Commit {
            tree: oid("cf0c2fd8ac653287b3bc1a8f988a580a8f512703"),
            parents: vec![oid("4550780e201f452725b2a06f42a74ade28a89db4")],
            author: somajit("1744389816 +0530"),
            committer: somajit("1744389816 +0530"),
            message: "hi there".into(),
        };
        assert_eq!(commit.id().to_hex(), "e9ace96e2ca6a2186a0c8a65b1b925f79a6d2ad2");
    }

    #[test]
    fn rfc3339_dates_render_as_epoch_utc() {
        let person = Person::new("a a", "a@a.a", "2025-01-01T00:00:00Z");
        assert_eq!(person.git_date(), "1735689600 +0000");
        assert_eq!(person.signature(), "a a <a@a.a> 1735689600 +0000");
    }

    #[test]
    fn empty_message_has_no_trailing_newline() {
        let commit = Commit::root(ObjectId::zero(), Person::new("a a", "a@a.a", "0 +0000"), "");
        let text = String::from_utf8(commit.encode()).unwrap();
        assert!(text.ends_with("0 +0000\n\n"));
        let with_message = Commit::root(ObjectId::zero(), Person::new("a a", "a@a.a", "0 +0000"), "text/plain");
        assert!(String::from_utf8(with_message.encode()).unwrap().ends_with("\n\ntext/plain\n"));
    }

    #[test]
    fn commit_decodes_its_encoding() {
        let commit = Commit {
            tree: oid("cf0c2fd8ac653287b3bc1a8f988a580a8f512703"),
            parents: vec![oid("4550780e201f452725b2a06f42a74ade28a89db4")],
            author: somajit("1744389816 +0530"),
            committer: somajit("1744389816 +0530"),
            message: "hi there".into(),
        };
        let decoded = Commit::from_stored_object(&commit.to_stored_object()).unwrap();
        assert_eq!(decoded, commit);
        assert_eq!(decoded.id(), commit.id());
    }

    #[test]
    fn decoded_fixed_identity_keeps_id() {
        let commit = Commit::root(
            oid("bd9dbf5aae1a3862dd1526723246b20206e5fc37"),
            Person::new("a a", "a@a.a", "2025-01-01T00:00:00Z"),
            "",
        );
        let decoded = Commit::from_stored_object(&commit.to_stored_object()).unwrap();
        assert_eq!(decoded.message, "");
        assert_eq!(decoded.id(), commit.id());
    }

    #[test]
    fn annotated_tag_id_matches_git() {
        let tag = AnnotatedTag {
            object: oid("d9ecde7f619917f2c0fb88e74ddf35bac4e6ec40"),
            object_kind: ObjectKind::Commit,
            tag: "annotated".into(),
            tagger: somajit("1744395850 +0530"),
            message: "Hello\nthere".into(),
        };
        assert_eq!(tag.id().to_hex(), "5a0e776cd195b704188508dbd54146f06a2994ec");
        assert_eq!(tag.to_stored_object().compute_id(), tag.id());
    }
}
