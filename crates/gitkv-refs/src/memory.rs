//! In-memory reference store for testing and ephemeral use.
//!
//! [`InMemoryRefStore`] keeps refs in a `HashMap` behind one `RwLock`. A
//! batch is checked and applied while holding the write lock, which makes
//! the store a single-writer transaction log: batches are totally ordered and
//! never interleave.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use gitkv_types::ObjectId;
use tracing::debug;

use crate::error::{RefError, Result};
use crate::names::validate_ref_name;
use crate::traits::RefStore;
use crate::types::{RefTransaction, RefUpdate};

#[derive(Debug, Default)]
struct RefState {
    refs: HashMap<String, ObjectId>,
    log: Vec<RefTransaction>,
}

/// An in-memory implementation of [`RefStore`].
#[derive(Debug, Default)]
pub struct InMemoryRefStore {
    state: RwLock<RefState>,
}

impl InMemoryRefStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every committed batch, oldest first.
    pub fn transactions(&self) -> Result<Vec<RefTransaction>> {
        Ok(self.read_state()?.log.clone())
    }

    fn read_state(&self) -> Result<RwLockReadGuard<'_, RefState>> {
        self.state
            .read()
            .map_err(|e| RefError::LockPoisoned(e.to_string()))
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, RefState>> {
        self.state
            .write()
            .map_err(|e| RefError::LockPoisoned(e.to_string()))
    }
}

impl RefStore for InMemoryRefStore {
    fn read_ref(&self, name: &str) -> Result<Option<ObjectId>> {
        Ok(self.read_state()?.refs.get(name).copied())
    }

    fn apply(&self, updates: &[RefUpdate]) -> Result<()> {
        let updates: Vec<RefUpdate> = updates.iter().map(RefUpdate::qualified).collect();
        for update in &updates {
            validate_ref_name(&update.name)?;
        }

        let mut state = self.write_state()?;
        for update in &updates {
            let current = state.refs.get(&update.name).copied();
            if !update.before.holds(current) {
                return Err(RefError::Conflict {
                    name: update.name.clone(),
                    expected: update.before,
                    actual: current,
                });
            }
        }

        for update in &updates {
            match update.after {
                Some(target) => {
                    state.refs.insert(update.name.clone(), target);
                }
                None => {
                    state.refs.remove(&update.name);
                }
            }
        }
        let sequence = state.log.len() as u64 + 1;
        debug!(sequence, updates = updates.len(), "applied ref batch");
        state.log.push(RefTransaction { sequence, updates });
        Ok(())
    }

    fn list_refs(&self, prefix: &str) -> Result<Vec<(String, ObjectId)>> {
        let state = self.read_state()?;
        let mut result: Vec<(String, ObjectId)> = state
            .refs
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .map(|(name, id)| (name.clone(), *id))
            .collect();
        result.sort_by(|(a, _), (b, _)| a.cmp(b));
        Ok(result)
    }
}
