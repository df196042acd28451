//! Per-operation write staging
//!
//! A `UnitOfWork` owns a fjall batch. Writes are staged into it and land
//! atomically on commit. Dropping it uncommitted discards everything.

use crate::StorageEngine;
use docsign_core::*;
use fjall::{Batch, Partition};
use serde::Serialize;

pub struct UnitOfWork<'a> {
    engine: &'a StorageEngine,
    batch: Batch,
    staged: usize,
}

impl<'a> UnitOfWork<'a> {
    pub(crate) fn new(engine: &'a StorageEngine, batch: Batch) -> Self {
        UnitOfWork {
            engine,
            batch,
            staged: 0,
        }
    }

    pub(crate) fn insert(
        &mut self,
        partition: &Partition,
        key: impl AsRef<[u8]>,
        value: impl AsRef<[u8]>,
    ) {
        self.batch
            .insert(partition, key.as_ref().to_vec(), value.as_ref().to_vec());
        self.staged += 1;
    }

    pub(crate) fn insert_json<T: Serialize>(
        &mut self,
        partition: &Partition,
        key: impl AsRef<[u8]>,
        value: &T,
    ) -> Result<()> {
        let json = serde_json::to_vec(value)?;
        self.insert(partition, key, json);
        Ok(())
    }

    /// Number of staged writes
    pub fn len(&self) -> usize {
        self.staged
    }

    pub fn is_empty(&self) -> bool {
        self.staged == 0
    }

    /// Commit unconditionally
    pub fn commit(self) -> Result<()> {
        self.commit_if(|_| Ok(()))
    }

    /// Commit only if `precondition` holds.
    ///
    /// The precondition runs under the engine commit lock, so no other
    /// commit can land between the check and the write. Returning an error
    /// from it discards the batch and surfaces that error.
    ///
    /// The journal is synced before the batch becomes visible. An error
    /// from the commit itself means nothing was applied.
    pub fn commit_if<F>(self, precondition: F) -> Result<()>
    where
        F: FnOnce(&StorageEngine) -> Result<()>,
    {
        let UnitOfWork { engine, batch, .. } = self;

        let _guard = engine
            .commit_lock()
            .lock()
            .map_err(|_| DocSignError::Internal("commit lock poisoned".to_string()))?;

        precondition(engine)?;

        batch
            .commit()
            .map_err(|e| DocSignError::Storage(e.to_string()))
    }
}
