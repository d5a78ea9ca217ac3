//! Foundation types for gitkv.
//!
//! gitkv stores typed keys and values inside a git hosting platform's object
//! database. This crate holds the vocabulary shared by every other gitkv crate.
//!
//! # Key Types
//!
//! - [`ObjectId`]: 20-byte SHA-1 git object id
//! - [`TypedValue`]: a key or value: number, boolean, string, JSON, blob or raw bytes
//! - [`TypeTag`]: the six value kinds, each bound to a well-known commit
//! - [`SerializedValue`]: the byte encoding produced by the value codec
//! - [`KeyId`]: the content-derived identifier of a key (`{tag}/{base64url}`)
//! - [`BiMap`] / [`TypeRegistry`]: exact two-way lookups between tags and commits

pub mod bimap;
pub mod codec;
pub mod error;
pub mod key;
pub mod object;
pub mod tag;
pub mod value;

pub use bimap::BiMap;
pub use codec::{ecmascript_number_text, SerializedValue, NUMBER_TEXT_LIMIT};
pub use error::{TypeError, TypeResult};
pub use key::KeyId;
pub use object::ObjectId;
pub use tag::{TypeRegistry, TypeTag};
pub use value::{BinaryObject, TypedValue};
