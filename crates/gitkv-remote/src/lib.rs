//! Backing-store client for gitkv.
//!
//! A gitkv database lives in a git repository on a hosting platform. This
//! crate stores payloads there as content-addressed commits, moves refs in
//! atomic batches and reads content back, from the platform API or from
//! public CDN mirrors.
//!
//! # Layers
//!
//! - [`RemoteTransport`] -- the platform seam: object uploads, ref lookups and
//!   atomic ref batches
//! - [`GitHubTransport`] -- REST and GraphQL implementation over `reqwest`
//! - [`InMemoryRemote`] -- in-process platform for tests and embedding
//! - [`MirrorChain`] -- ordered public read fallback
//! - [`Repository`] -- offline hashing, deduplicating writes, encryption and
//!   public links on top of a transport

pub mod config;
pub mod error;
pub mod github;
pub mod memory;
pub mod mirror;
pub mod repository;
pub mod transport;

pub use config::{RemoteConfig, DEFAULT_MIRRORS};
pub use error::{RemoteError, RemoteResult};
pub use github::GitHubTransport;
pub use memory::{InMemoryMirror, InMemoryRemote};
pub use mirror::{HttpMirror, Mirror, MirrorChain, MirrorError, VALUE_PATH};
pub use repository::{identity, LinkKind, Repository, WriteOptions};
pub use transport::{RemoteTransport, RepositoryInfo, ValueSlot};
