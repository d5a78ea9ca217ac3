//! Git object model for gitkv.
//!
//! Reproduces git's object encodings byte for byte so object ids can be
//! computed offline and compared against the remote before any upload.
//! Every object is identified by the SHA-1 of its kind header and content.
//!
//! # Object Types
//!
//! - [`Blob`] -- raw content
//! - [`Tree`] -- sorted entries mapping names to object ids
//! - [`Commit`] -- tree, parents, author, committer and message
//! - [`AnnotatedTag`] -- named pointer to another object, with tagger and message
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written (content-addressing guarantees this).
//! 2. Encoding is canonical: the same logical object always has the same bytes.
//! 3. The store never interprets object contents beyond the kind tag.

pub mod error;
pub mod memory;
pub mod object;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryObjectStore;
pub use object::{
    AnnotatedTag, Blob, Commit, EntryMode, ObjectKind, Person, StoredObject, Tree, TreeEntry,
    VALUE_FILE_NAMES,
};
pub use traits::ObjectStore;
