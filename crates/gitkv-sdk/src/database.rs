//! The key-value API.
//!
//! An entry is three refs: an existence marker tag pointing at the key's own
//! commit, and two branches pointing at the value commit and at the value's
//! type commit. Every mutation is a single atomic ref batch, so concurrent
//! writers never see a half-applied entry.

use std::future::Future;
use std::sync::Arc;

use gitkv_crypto::PayloadCipher;
use gitkv_refs::{KeyRefs, RefUpdate};
use gitkv_remote::{RemoteConfig, Repository, WriteOptions};
use gitkv_types::{KeyId, ObjectId, SerializedValue, TypeRegistry, TypeTag, TypedValue};
use tracing::{debug, info};

use crate::error::{KvError, KvResult};
use crate::ops::{CreateOptions, CreateOutcome, KeyIdentity, Snapshot, UpdateOutcome};

/// A key-value database stored in one repository.
#[derive(Debug)]
pub struct Database {
    repository: Repository,
    types: TypeRegistry,
}

impl Database {
    pub fn new(repository: Repository) -> KvResult<Self> {
        Ok(Self {
            repository,
            types: TypeRegistry::well_known()?,
        })
    }

    /// Connect to the GitHub repository described by `config`.
    pub async fn connect(
        config: &RemoteConfig,
        cipher: Option<Arc<dyn PayloadCipher>>,
    ) -> KvResult<Self> {
        Self::new(Repository::github(config, cipher).await?)
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    fn type_commit(&self, tag: TypeTag) -> KvResult<ObjectId> {
        self.types
            .commit_of(tag)
            .ok_or_else(|| KvError::Corrupt(format!("no type commit registered for {tag}")))
    }

    fn value_options(&self, serialized: &SerializedValue) -> WriteOptions {
        WriteOptions::new(serialized.mime_type.clone().unwrap_or_default())
            .encrypted(self.repository.is_encrypted())
    }

    /// Compute the identifier of `key`.
    ///
    /// With `push` the key's bytes are also stored, which `create` needs so
    /// the key can later be recovered from its identifier. Key bytes are
    /// never encrypted.
    pub async fn identify(&self, key: &TypedValue, push: bool) -> KvResult<KeyIdentity> {
        let serialized = key.serialize()?;
        let opts = WriteOptions::new(serialized.mime_type.clone().unwrap_or_default());
        let commit = if push {
            self.repository.write(&serialized.bytes, &opts).await?
        } else {
            self.repository.content_hash_of(&serialized.bytes, &opts)?
        };
        Ok(KeyIdentity {
            id: KeyId::new(serialized.tag, commit),
        })
    }

    /// Recover a key from its identifier.
    pub async fn uuid_to_key(&self, uuid: &str) -> KvResult<TypedValue> {
        let id: KeyId = uuid.parse()?;
        let message = async {
            if id.tag == TypeTag::Blob {
                self.repository.fetch_message(&id.commit).await
            } else {
                Ok(None)
            }
        };
        let (bytes, mime) =
            tokio::try_join!(self.repository.fetch_content(&id.commit, false), message)?;
        let bytes = bytes.ok_or(KvError::NotFound(id))?;
        Ok(TypedValue::deserialize(id.tag, mime.as_deref(), &bytes)?)
    }

    /// Store `value` under `key`.
    ///
    /// Fails with [`KvError::KeyExists`] if the key is present and
    /// `opts.overwrite` is not set.
    pub async fn create(
        &self,
        key: &TypedValue,
        value: &TypedValue,
        opts: CreateOptions,
    ) -> KvResult<CreateOutcome> {
        let serialized = value.serialize()?;
        let value_opts = self.value_options(&serialized);
        let write_value = async {
            self.repository
                .write(&serialized.bytes, &value_opts)
                .await
                .map_err(KvError::from)
        };
        let (identity, value_commit) = tokio::try_join!(self.identify(key, true), write_value)?;

        let refs = KeyRefs::for_key(&identity.id);
        let marker = if opts.overwrite {
            RefUpdate::force(refs.marker.as_str(), identity.commit())
        } else {
            RefUpdate::create(refs.marker.as_str(), identity.commit())
        };
        let batch = [
            marker,
            RefUpdate::force(refs.bytes.as_str(), value_commit),
            RefUpdate::force(refs.kind.as_str(), self.type_commit(serialized.tag)?),
        ];

        if let Err(e) = self.repository.update_refs(&batch).await {
            if !opts.overwrite && matches!(self.has(key).await, Ok(true)) {
                return Err(KvError::KeyExists(identity.id));
            }
            return Err(e.into());
        }

        info!(key = %identity.id, value_type = %serialized.tag, overwrite = opts.overwrite, "created entry");
        Ok(CreateOutcome {
            id: identity.id,
            links: self.repository.public_links(&value_commit),
        })
    }

    /// Whether `key` currently has a value.
    pub async fn has(&self, key: &TypedValue) -> KvResult<bool> {
        let identity = self.identify(key, false).await?;
        let refs = KeyRefs::for_key(&identity.id);
        Ok(self.repository.resolve_ref(&refs.bytes).await?.is_some())
    }

    /// The value stored under `key`, or `None` if there is none.
    pub async fn read(&self, key: &TypedValue) -> KvResult<Option<TypedValue>> {
        let identity = self.identify(key, false).await?;
        Ok(self.snapshot(&identity.id).await?.map(|s| s.value))
    }

    async fn snapshot(&self, id: &KeyId) -> KvResult<Option<Snapshot>> {
        let refs = KeyRefs::for_key(id);
        let slot = self.repository.value_slot(&refs.bytes, &refs.kind).await?;
        let Some(commit) = slot.bytes else {
            return Ok(None);
        };
        let kind = slot
            .kind
            .ok_or_else(|| KvError::Corrupt(format!("{id} has a value but no type")))?;
        let tag = self.types.tag_of(&kind)?;

        let mime = match (tag, slot.message) {
            (TypeTag::Blob, Some(message)) => Some(message),
            (TypeTag::Blob, None) => self.repository.fetch_message(&commit).await?,
            _ => None,
        };

        let decrypt = self.repository.is_encrypted();
        let bytes = match slot.file {
            Some(file) if !self.repository.is_public() => {
                self.repository.fetch_blob(&file, decrypt).await?
            }
            _ => self.repository.fetch_content(&commit, decrypt).await?,
        };
        let bytes =
            bytes.ok_or_else(|| KvError::Corrupt(format!("value commit {commit} of {id} is missing")))?;

        Ok(Some(Snapshot {
            value: TypedValue::deserialize(tag, mime.as_deref(), &bytes)?,
            commit,
        }))
    }

    /// Replace the value of `key` with `modifier(old)`.
    ///
    /// The value ref is moved with a compare-and-swap against the commit that
    /// was read, so a concurrent writer makes this fail with
    /// [`KvError::Conflict`] and leaves the winner's value in place.
    pub async fn update<F, Fut>(&self, key: &TypedValue, modifier: F) -> KvResult<UpdateOutcome>
    where
        F: FnOnce(TypedValue) -> Fut + Send,
        Fut: Future<Output = KvResult<TypedValue>> + Send,
    {
        let identity = self.identify(key, false).await?;
        let snapshot = self
            .snapshot(&identity.id)
            .await?
            .ok_or(KvError::NotFound(identity.id))?;

        let new_value = modifier(snapshot.value.clone()).await?;
        let serialized = new_value.serialize()?;
        let commit = self
            .repository
            .write(&serialized.bytes, &self.value_options(&serialized))
            .await?;

        let refs = KeyRefs::for_key(&identity.id);
        let batch = [
            RefUpdate::compare_and_swap(refs.bytes.as_str(), snapshot.commit, commit),
            RefUpdate::force(refs.kind.as_str(), self.type_commit(serialized.tag)?),
        ];
        self.repository.update_refs(&batch).await.map_err(|e| {
            if e.is_ref_rejection() {
                debug!(key = %identity.id, error = %e, "value changed during update");
                KvError::Conflict(identity.id)
            } else {
                KvError::from(e)
            }
        })?;

        Ok(UpdateOutcome {
            old_value: snapshot.value,
            new_value,
            links: self.repository.public_links(&commit),
        })
    }

    /// Add `delta` to a Number value.
    pub async fn increment(&self, key: &TypedValue, delta: f64) -> KvResult<UpdateOutcome> {
        self.update(key, move |old| async move {
            match old {
                TypedValue::Number(n) => Ok(TypedValue::Number(n + delta)),
                other => Err(KvError::TypeMismatch {
                    expected: TypeTag::Number,
                    actual: other.tag(),
                }),
            }
        })
        .await
    }

    /// Negate a Boolean value.
    pub async fn toggle(&self, key: &TypedValue) -> KvResult<UpdateOutcome> {
        self.update(key, |old| async move {
            match old {
                TypedValue::Boolean(b) => Ok(TypedValue::Boolean(!b)),
                other => Err(KvError::TypeMismatch {
                    expected: TypeTag::Boolean,
                    actual: other.tag(),
                }),
            }
        })
        .await
    }

    /// Remove every key in `keys` in one atomic batch.
    pub async fn delete(&self, keys: &[TypedValue]) -> KvResult<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut batch = Vec::with_capacity(keys.len() * 3);
        for key in keys {
            let identity = self.identify(key, false).await?;
            let refs = KeyRefs::for_key(&identity.id);
            batch.extend(refs.all().into_iter().map(RefUpdate::delete));
        }
        self.repository.update_refs(&batch).await?;
        info!(keys = keys.len(), "deleted entries");
        Ok(())
    }
}
