//! Content-addressed client for one backing repository.
//!
//! Every payload is stored as a parentless commit whose tree holds the same
//! blob under `value`, `value.txt` and `value.json`. Author, committer and
//! date are fixed, so the commit id is a pure function of payload and
//! message. [`Repository::content_hash_of`] computes it offline and
//! [`Repository::write`] skips the upload when the remote already has it.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use gitkv_crypto::PayloadCipher;
use gitkv_refs::{qualify, type_marker, RefUpdate};
use gitkv_store::{Blob, Commit, Person, Tree, VALUE_FILE_NAMES};
use gitkv_types::{ObjectId, TypeTag};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::RemoteConfig;
use crate::error::{RemoteError, RemoteResult};
use crate::github::GitHubTransport;
use crate::memory::InMemoryRemote;
use crate::mirror::{Mirror, MirrorChain};
use crate::transport::{RemoteTransport, RepositoryInfo, ValueSlot};

/// Author and committer of every value commit.
pub fn identity() -> Person {
    Person::new("a a", "a@a.a", "2025-01-01T00:00:00Z")
}

/// How a payload is committed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Commit message. Carries the MIME type of binary objects.
    pub message: String,
    pub encrypt: bool,
}

impl WriteOptions {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            encrypt: false,
        }
    }

    pub fn encrypted(mut self, encrypt: bool) -> Self {
        self.encrypt = encrypt;
        self
    }
}

/// The public views of a committed value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkKind {
    OctetStream,
    Text,
    Json,
}

impl LinkKind {
    pub const ALL: [LinkKind; 3] = [LinkKind::OctetStream, LinkKind::Text, LinkKind::Json];

    /// The file of the value tree served with this content type.
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::OctetStream => VALUE_FILE_NAMES[0],
            Self::Text => VALUE_FILE_NAMES[1],
            Self::Json => VALUE_FILE_NAMES[2],
        }
    }
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OctetStream => "octet-stream",
            Self::Text => "text",
            Self::Json => "json",
        })
    }
}

struct PreparedContent {
    payload: Vec<u8>,
    blob: ObjectId,
    tree: Tree,
    commit: Commit,
}

/// A connected, provisioned backing repository.
pub struct Repository {
    transport: Arc<dyn RemoteTransport>,
    mirrors: MirrorChain,
    cipher: Option<Arc<dyn PayloadCipher>>,
    info: RepositoryInfo,
}

impl Repository {
    /// Fetch repository metadata and check provisioning, concurrently.
    ///
    /// Fails with [`RemoteError::NotProvisioned`] unless
    /// `refs/tags/kv/types/ArrayBuffer` points at the ArrayBuffer type commit.
    pub async fn connect(
        transport: Arc<dyn RemoteTransport>,
        mirrors: MirrorChain,
        cipher: Option<Arc<dyn PayloadCipher>>,
    ) -> RemoteResult<Self> {
        let marker = type_marker(TypeTag::Bytes);
        let (info, provisioned) =
            tokio::try_join!(transport.repository_info(), transport.resolve_ref(&marker))?;

        match provisioned {
            Some(id) if id == TypeTag::Bytes.commit_id() => {}
            Some(other) => {
                return Err(RemoteError::NotProvisioned(format!("{marker} points at {other}")))
            }
            None => return Err(RemoteError::NotProvisioned(format!("{marker} is missing"))),
        }

        info!(
            repository = %info.id,
            public = info.is_public,
            encrypted = cipher.is_some(),
            authenticated = transport.is_authenticated(),
            "connected to repository"
        );
        Ok(Self {
            transport,
            mirrors,
            cipher,
            info,
        })
    }

    /// Connect to GitHub with the configured mirrors.
    pub async fn github(
        config: &RemoteConfig,
        cipher: Option<Arc<dyn PayloadCipher>>,
    ) -> RemoteResult<Self> {
        let transport = GitHubTransport::new(config)?;
        let mirror_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .build()?;
        let mirrors = MirrorChain::from_config(config, mirror_client);
        Self::connect(Arc::new(transport), mirrors, cipher).await
    }

    /// Connect to an in-process repository, reading public content through
    /// its mirror.
    pub async fn in_memory(
        remote: &InMemoryRemote,
        cipher: Option<Arc<dyn PayloadCipher>>,
    ) -> RemoteResult<Self> {
        let mirror: Arc<dyn Mirror> = Arc::new(remote.mirror());
        let mirrors = MirrorChain::new(vec![mirror]);
        Self::connect(Arc::new(remote.clone()), mirrors, cipher).await
    }

    pub fn info(&self) -> &RepositoryInfo {
        &self.info
    }

    pub fn is_public(&self) -> bool {
        self.info.is_public
    }

    pub fn is_encrypted(&self) -> bool {
        self.cipher.is_some()
    }

    pub fn is_authenticated(&self) -> bool {
        self.transport.is_authenticated()
    }

    fn cipher(&self) -> RemoteResult<&dyn PayloadCipher> {
        self.cipher
            .as_deref()
            .ok_or_else(|| RemoteError::Config("no cipher configured for this repository".into()))
    }

    fn prepare(&self, bytes: &[u8], opts: &WriteOptions) -> RemoteResult<PreparedContent> {
        let payload = if opts.encrypt {
            self.cipher()?.encrypt(bytes)?
        } else {
            bytes.to_vec()
        };
        let blob = Blob::new(payload);
        let blob_id = blob.id();
        let tree = Tree::value_layout(blob_id);
        let commit = Commit::root(tree.id(), identity(), opts.message.as_str());
        Ok(PreparedContent {
            payload: blob.data,
            blob: blob_id,
            tree,
            commit,
        })
    }

    /// The id `write` would return, computed without network access.
    pub fn content_hash_of(&self, bytes: &[u8], opts: &WriteOptions) -> RemoteResult<ObjectId> {
        Ok(self.prepare(bytes, opts)?.commit.id())
    }

    /// Whether the remote holds commit `id`.
    pub async fn exists(&self, id: &ObjectId) -> RemoteResult<bool> {
        self.transport.commit_exists(id).await
    }

    /// Store `bytes` as a value commit and return its id.
    ///
    /// Uploads nothing when the commit already exists. Fails with
    /// [`RemoteError::HashMismatch`] if the remote disagrees with the offline
    /// hash of any uploaded object.
    pub async fn write(&self, bytes: &[u8], opts: &WriteOptions) -> RemoteResult<ObjectId> {
        let prepared = self.prepare(bytes, opts)?;
        let expected = prepared.commit.id();
        if self.exists(&expected).await? {
            debug!(commit = %expected.short_hex(), "content already stored, skipping upload");
            return Ok(expected);
        }

        let blob = self.transport.create_blob(&prepared.payload).await?;
        check_hash(prepared.blob, blob)?;
        let tree = self.transport.create_tree(&prepared.tree).await?;
        check_hash(prepared.tree.id(), tree)?;
        let commit = self.transport.create_commit(&prepared.commit).await?;
        check_hash(expected, commit)?;

        debug!(
            commit = %commit.short_hex(),
            bytes = prepared.payload.len(),
            encrypted = opts.encrypt,
            "uploaded content"
        );
        Ok(commit)
    }

    /// Apply a ref batch atomically. Bare names are branches.
    pub async fn update_refs(&self, updates: &[RefUpdate]) -> RemoteResult<()> {
        let updates: Vec<RefUpdate> = updates.iter().map(RefUpdate::qualified).collect();
        self.transport.update_refs(&self.info.id, &updates).await
    }

    pub async fn resolve_ref(&self, name: &str) -> RemoteResult<Option<ObjectId>> {
        self.transport.resolve_ref(&qualify(name)).await
    }

    /// Resolve a key's `value/bytes` and `value/type` refs together.
    pub async fn value_slot(&self, bytes_ref: &str, type_ref: &str) -> RemoteResult<ValueSlot> {
        self.transport
            .value_slot(&self.info.id, &qualify(bytes_ref), &qualify(type_ref))
            .await
    }

    /// Read a blob through the platform API.
    pub async fn fetch_blob(&self, blob: &ObjectId, decrypt: bool) -> RemoteResult<Option<Vec<u8>>> {
        match self.transport.fetch_blob(blob).await? {
            Some(data) => Ok(Some(self.open(data, decrypt)?)),
            None => Ok(None),
        }
    }

    /// Read the `value` file of commit `id`.
    ///
    /// Public repositories are read through the mirrors; private ones
    /// through the platform API.
    pub async fn fetch_content(&self, id: &ObjectId, decrypt: bool) -> RemoteResult<Option<Vec<u8>>> {
        let data = if self.info.is_public {
            self.mirrors.fetch(id).await?
        } else {
            match self.transport.commit_file(id, VALUE_FILE_NAMES[0]).await? {
                Some(blob) => self.transport.fetch_blob(&blob).await?,
                None => None,
            }
        };
        match data {
            Some(data) => Ok(Some(self.open(data, decrypt)?)),
            None => Ok(None),
        }
    }

    fn open(&self, data: Vec<u8>, decrypt: bool) -> RemoteResult<Vec<u8>> {
        if decrypt {
            Ok(self.cipher()?.decrypt(&data)?)
        } else {
            Ok(data)
        }
    }

    pub async fn fetch_message(&self, id: &ObjectId) -> RemoteResult<Option<String>> {
        self.transport.commit_message(id).await
    }

    /// Public URLs of commit `id`, one per [`LinkKind`]. Empty for private
    /// or encrypted repositories.
    pub fn public_links(&self, id: &ObjectId) -> BTreeMap<LinkKind, String> {
        if !self.info.is_public || self.is_encrypted() {
            return BTreeMap::new();
        }
        let Some(base) = self.mirrors.primary_url(id) else {
            return BTreeMap::new();
        };
        LinkKind::ALL
            .iter()
            .map(|kind| (*kind, format!("{base}/{}", kind.file_name())))
            .collect()
    }
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("info", &self.info)
            .field("mirrors", &self.mirrors)
            .field("encrypted", &self.is_encrypted())
            .finish_non_exhaustive()
    }
}

fn check_hash(expected: ObjectId, actual: ObjectId) -> RemoteResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(RemoteError::HashMismatch { expected, actual })
    }
}
