use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use gitkv_types::ObjectId;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::object::StoredObject;
use crate::traits::ObjectStore;

/// In-memory, HashMap-based object store.
///
/// Intended for tests and embedding. All objects are held behind a `RwLock`
/// and cloned on read/write. Every write that adds a new object is counted,
/// so callers can assert how many uploads an operation performed.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<ObjectId, StoredObject>>,
    writes: RwLock<u64>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.objects_read()?.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.objects_read()?.is_empty())
    }

    /// Number of writes that stored a previously absent object.
    pub fn new_object_writes(&self) -> StoreResult<u64> {
        self.writes
            .read()
            .map(|count| *count)
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn objects_read(&self) -> StoreResult<RwLockReadGuard<'_, HashMap<ObjectId, StoredObject>>> {
        self.objects
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn objects_write(&self) -> StoreResult<RwLockWriteGuard<'_, HashMap<ObjectId, StoredObject>>> {
        self.objects
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>> {
        Ok(self.objects_read()?.get(id).cloned())
    }

    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId> {
        let id = object.compute_id();
        let mut map = self.objects_write()?;
        if map.contains_key(&id) {
            return Ok(id);
        }
        map.insert(id, object.clone());
        drop(map);

        let mut writes = self
            .writes
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        *writes += 1;
        debug!(id = %id, kind = %object.kind, size = object.size, "stored object");
        Ok(id)
    }

    fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.objects_read()?.contains_key(id))
    }
}
