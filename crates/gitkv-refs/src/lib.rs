//! Reference management for gitkv.
//!
//! Every stored key owns three refs: an existence marker tag and two value
//! branches (payload bytes and type). All mutation goes through batches of
//! [`RefUpdate`]s that apply atomically, each carrying an optional
//! compare-and-swap [`Precondition`]. This batch is the only concurrency
//! control gitkv has.
//!
//! # Modules
//!
//! - [`error`]: Error types for ref operations
//! - [`types`]: [`RefUpdate`], [`Precondition`] and [`RefTransaction`]
//! - [`traits`]: The [`RefStore`] trait defining the storage interface
//! - [`names`]: Key ref layout and ref name validation
//! - [`memory`]: In-memory [`InMemoryRefStore`] for tests

pub mod error;
pub mod memory;
pub mod names;
pub mod traits;
pub mod types;

pub use error::{RefError, Result};
pub use memory::InMemoryRefStore;
pub use names::{qualify, type_marker, validate_ref_name, KeyRefs};
pub use traits::RefStore;
pub use types::{Precondition, RefTransaction, RefUpdate};
