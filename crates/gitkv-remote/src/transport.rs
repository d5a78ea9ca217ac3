use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gitkv_refs::RefUpdate;
use gitkv_store::{Commit, Tree};
use gitkv_types::ObjectId;
use serde::{Deserialize, Serialize};

use crate::error::RemoteResult;

/// Repository metadata fetched once at connect time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryInfo {
    /// Platform node id, addressed by ref batches.
    pub id: String,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
}

/// Everything a read needs about a key's value, in as few round trips as
/// the transport allows.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValueSlot {
    /// Target of `value/bytes`.
    pub bytes: Option<ObjectId>,
    /// Target of `value/type`.
    pub kind: Option<ObjectId>,
    /// Message of the `value/bytes` commit, when fetched alongside.
    pub message: Option<String>,
    /// Blob id of the `value` file, when fetched alongside.
    pub file: Option<ObjectId>,
}

/// Transport interface for a git hosting platform.
///
/// Ref names passed in are fully qualified. Lookups return `Ok(None)` on a
/// definite 404 and an error for anything else.
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    async fn repository_info(&self) -> RemoteResult<RepositoryInfo>;

    async fn resolve_ref(&self, name: &str) -> RemoteResult<Option<ObjectId>>;

    async fn commit_exists(&self, id: &ObjectId) -> RemoteResult<bool>;

    async fn create_blob(&self, data: &[u8]) -> RemoteResult<ObjectId>;

    async fn create_tree(&self, tree: &Tree) -> RemoteResult<ObjectId>;

    async fn create_commit(&self, commit: &Commit) -> RemoteResult<ObjectId>;

    /// Apply the batch atomically.
    async fn update_refs(&self, repository_id: &str, updates: &[RefUpdate]) -> RemoteResult<()>;

    async fn commit_message(&self, id: &ObjectId) -> RemoteResult<Option<String>>;

    /// Blob id of `path` in the tree of `commit`.
    async fn commit_file(&self, commit: &ObjectId, path: &str) -> RemoteResult<Option<ObjectId>>;

    async fn fetch_blob(&self, id: &ObjectId) -> RemoteResult<Option<Vec<u8>>>;

    /// Resolve both value refs of a key.
    async fn value_slot(
        &self,
        _repository_id: &str,
        bytes_ref: &str,
        type_ref: &str,
    ) -> RemoteResult<ValueSlot> {
        let (bytes, kind) = tokio::try_join!(self.resolve_ref(bytes_ref), self.resolve_ref(type_ref))?;
        Ok(ValueSlot {
            bytes,
            kind,
            ..ValueSlot::default()
        })
    }

    /// Whether privileged (token) access is available.
    fn is_authenticated(&self) -> bool;
}
