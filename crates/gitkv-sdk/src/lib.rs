//! Key-value database on top of a git hosting platform.
//!
//! Keys and values are [`TypedValue`]s. A key is identified by the content
//! hash of its serialized bytes, so every client derives the same identifier
//! without coordination. Values are stored as commits and bound to keys by
//! refs, and every mutation is one atomic ref batch.
//!
//! ```no_run
//! use gitkv_sdk::{CreateOptions, Database, RemoteConfig, TypedValue};
//!
//! # async fn demo() -> gitkv_sdk::KvResult<()> {
//! let config = RemoteConfig::new("octo", "kv").with_token("ghp_...");
//! let db = Database::connect(&config, None).await?;
//! db.create(&"visits".into(), &0.into(), CreateOptions::default()).await?;
//! db.increment(&"visits".into(), 1.0).await?;
//! assert_eq!(db.read(&"visits".into()).await?, Some(TypedValue::Number(1.0)));
//! # Ok(())
//! # }
//! ```

pub mod database;
pub mod error;
pub mod ops;

pub use database::Database;
pub use error::{KvError, KvResult};
pub use ops::{CreateOptions, CreateOutcome, KeyIdentity, UpdateOutcome};

pub use gitkv_crypto::{Codec, IvSource, PayloadCipher};
pub use gitkv_remote::{InMemoryRemote, LinkKind, RemoteConfig, Repository};
pub use gitkv_types::{BinaryObject, KeyId, ObjectId, TypeTag, TypedValue};
