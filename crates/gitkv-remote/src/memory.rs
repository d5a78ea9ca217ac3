//! In-process hosting platform for tests and embedding.
//!
//! [`InMemoryRemote`] behaves like a hosted repository: it stores real git
//! objects, verifies that trees and commits only reference objects it holds,
//! applies ref batches atomically, and serves public content through an
//! in-process [`Mirror`]. Clones share state, so several clients can race
//! against one repository.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use gitkv_refs::{qualify, type_marker, InMemoryRefStore, RefStore, RefUpdate};
use gitkv_store::{
    Blob, Commit, InMemoryObjectStore, ObjectKind, ObjectStore, StoredObject, Tree,
};
use gitkv_types::{ObjectId, TypeTag};
use tracing::debug;

use crate::error::{RemoteError, RemoteResult};
use crate::mirror::{Mirror, MirrorError, VALUE_PATH};
use crate::transport::{RemoteTransport, RepositoryInfo, ValueSlot};

#[derive(Debug)]
struct RemoteState {
    objects: InMemoryObjectStore,
    refs: InMemoryRefStore,
    info: RepositoryInfo,
    mirror_online: AtomicBool,
}

impl RemoteState {
    fn read_kind(&self, id: &ObjectId, kind: ObjectKind) -> RemoteResult<Option<StoredObject>> {
        Ok(self.objects.read(id)?.filter(|obj| obj.kind == kind))
    }

    fn commit(&self, id: &ObjectId) -> RemoteResult<Option<Commit>> {
        match self.read_kind(id, ObjectKind::Commit)? {
            Some(obj) => Ok(Some(Commit::from_stored_object(&obj)?)),
            None => Ok(None),
        }
    }

    fn file_of(&self, commit: &ObjectId, path: &str) -> RemoteResult<Option<ObjectId>> {
        let Some(commit) = self.commit(commit)? else {
            return Ok(None);
        };
        let tree = Tree::from_stored_object(&self.objects.read_required(&commit.tree)?)?;
        Ok(tree.get(path).map(|entry| entry.object_id))
    }

    fn blob(&self, id: &ObjectId) -> RemoteResult<Option<Vec<u8>>> {
        match self.read_kind(id, ObjectKind::Blob)? {
            Some(obj) => Ok(Some(Blob::from_stored_object(&obj)?.data)),
            None => Ok(None),
        }
    }

    fn require(&self, context: &str, id: &ObjectId) -> RemoteResult<()> {
        if self.objects.exists(id)? {
            Ok(())
        } else {
            Err(RemoteError::Status {
                context: context.to_string(),
                status: 422,
                message: format!("object {id} does not exist"),
            })
        }
    }
}

/// A hosted repository kept entirely in memory.
#[derive(Debug, Clone)]
pub struct InMemoryRemote {
    state: Arc<RemoteState>,
    authenticated: bool,
}

impl InMemoryRemote {
    /// A private repository accessed with a token.
    pub fn private() -> Self {
        Self::with_visibility(false)
    }

    /// A public repository accessed with a token.
    pub fn public() -> Self {
        Self::with_visibility(true)
    }

    fn with_visibility(is_public: bool) -> Self {
        let created_at = Utc::now();
        let state = RemoteState {
            objects: InMemoryObjectStore::new(),
            refs: InMemoryRefStore::new(),
            info: RepositoryInfo {
                id: format!("R_mem{}", created_at.timestamp_nanos_opt().unwrap_or_default()),
                is_public,
                created_at,
            },
            mirror_online: AtomicBool::new(true),
        };
        Self {
            state: Arc::new(state),
            authenticated: true,
        }
    }

    /// Another handle on the same repository, without a token.
    pub fn anonymous(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            authenticated: false,
        }
    }

    /// Point every `refs/tags/kv/types/{TypeName}` at its type commit.
    pub fn provision(&self) -> RemoteResult<()> {
        let updates: Vec<RefUpdate> = TypeTag::ALL
            .iter()
            .map(|tag| RefUpdate::force(type_marker(*tag), tag.commit_id()))
            .collect();
        self.state.refs.apply(&updates)?;
        Ok(())
    }

    /// Number of objects uploaded that were not already stored.
    pub fn uploads(&self) -> RemoteResult<u64> {
        Ok(self.state.objects.new_object_writes()?)
    }

    pub fn object_count(&self) -> RemoteResult<usize> {
        Ok(self.state.objects.len()?)
    }

    /// Refs under `prefix`, sorted by name.
    pub fn refs(&self, prefix: &str) -> RemoteResult<Vec<(String, ObjectId)>> {
        Ok(self.state.refs.list_refs(prefix)?)
    }

    /// Number of ref batches applied so far.
    pub fn ref_batches(&self) -> RemoteResult<usize> {
        Ok(self.state.refs.transactions()?.len())
    }

    /// A mirror serving this repository's committed files.
    pub fn mirror(&self) -> InMemoryMirror {
        InMemoryMirror {
            state: Arc::clone(&self.state),
        }
    }

    /// Take the mirror offline or bring it back.
    pub fn set_mirror_online(&self, online: bool) {
        self.state.mirror_online.store(online, Ordering::SeqCst);
    }
}

#[async_trait]
impl RemoteTransport for InMemoryRemote {
    async fn repository_info(&self) -> RemoteResult<RepositoryInfo> {
        Ok(self.state.info.clone())
    }

    async fn resolve_ref(&self, name: &str) -> RemoteResult<Option<ObjectId>> {
        Ok(self.state.refs.read_ref(&qualify(name))?)
    }

    async fn commit_exists(&self, id: &ObjectId) -> RemoteResult<bool> {
        Ok(self.state.read_kind(id, ObjectKind::Commit)?.is_some())
    }

    async fn create_blob(&self, data: &[u8]) -> RemoteResult<ObjectId> {
        Ok(self.state.objects.write(&Blob::new(data.to_vec()).to_stored_object())?)
    }

    async fn create_tree(&self, tree: &Tree) -> RemoteResult<ObjectId> {
        for entry in &tree.entries {
            self.state.require("tree upload", &entry.object_id)?;
        }
        Ok(self.state.objects.write(&tree.to_stored_object())?)
    }

    async fn create_commit(&self, commit: &Commit) -> RemoteResult<ObjectId> {
        self.state.require("commit upload", &commit.tree)?;
        for parent in &commit.parents {
            self.state.require("commit upload", parent)?;
        }
        Ok(self.state.objects.write(&commit.to_stored_object())?)
    }

    async fn update_refs(&self, repository_id: &str, updates: &[RefUpdate]) -> RemoteResult<()> {
        if !self.authenticated {
            return Err(RemoteError::Status {
                context: "ref update".into(),
                status: 401,
                message: "requires authentication".into(),
            });
        }
        if repository_id != self.state.info.id {
            return Err(RemoteError::GraphQl(format!(
                "Could not resolve to a node with the global id of '{repository_id}'"
            )));
        }
        debug!(updates = updates.len(), "in-memory ref batch");
        self.state.refs.apply(updates)?;
        Ok(())
    }

    async fn commit_message(&self, id: &ObjectId) -> RemoteResult<Option<String>> {
        Ok(self.state.commit(id)?.map(|c| c.message))
    }

    async fn commit_file(&self, commit: &ObjectId, path: &str) -> RemoteResult<Option<ObjectId>> {
        self.state.file_of(commit, path)
    }

    async fn fetch_blob(&self, id: &ObjectId) -> RemoteResult<Option<Vec<u8>>> {
        self.state.blob(id)
    }

    async fn value_slot(
        &self,
        _repository_id: &str,
        bytes_ref: &str,
        type_ref: &str,
    ) -> RemoteResult<ValueSlot> {
        let bytes = self.resolve_ref(bytes_ref).await?;
        let kind = self.resolve_ref(type_ref).await?;
        let mut slot = ValueSlot {
            bytes,
            kind,
            ..ValueSlot::default()
        };
        if self.authenticated {
            if let Some(commit) = bytes {
                slot.message = self.state.commit(&commit)?.map(|c| c.message);
                slot.file = self.state.file_of(&commit, VALUE_PATH)?;
            }
        }
        Ok(slot)
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}

/// CDN-like view of an [`InMemoryRemote`]. Private repositories answer 404.
#[derive(Debug, Clone)]
pub struct InMemoryMirror {
    state: Arc<RemoteState>,
}

#[async_trait]
impl Mirror for InMemoryMirror {
    fn base_url(&self, commit: &ObjectId) -> String {
        format!("memory://{}/{commit}", self.state.info.id)
    }

    async fn fetch(&self, commit: &ObjectId) -> Result<Vec<u8>, MirrorError> {
        if !self.state.mirror_online.load(Ordering::SeqCst) {
            return Err(MirrorError::Unavailable("mirror offline".into()));
        }
        if !self.state.info.is_public {
            return Err(MirrorError::NotFound);
        }
        let blob = self
            .state
            .file_of(commit, VALUE_PATH)
            .map_err(|e| MirrorError::Unavailable(e.to_string()))?
            .ok_or(MirrorError::NotFound)?;
        self.state
            .blob(&blob)
            .map_err(|e| MirrorError::Unavailable(e.to_string()))?
            .ok_or(MirrorError::NotFound)
    }
}
