//! Storage engine and document services built on fjall

use docsign_core::*;
use fjall::{Config, Keyspace, Partition, PartitionCreateOptions, PersistMode};
use std::path::Path;
use std::sync::{Arc, Mutex};

pub mod artifacts;
pub mod credentials;
pub mod guard;
pub mod mark;
pub mod records;
pub mod registry;
pub mod services;
pub mod signing;
pub mod unit_of_work;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use artifacts::*;
pub use credentials::*;
pub use guard::*;
pub use mark::*;
pub use registry::*;
pub use services::*;
pub use signing::*;
pub use unit_of_work::*;

/// Named partitions of the keyspace
#[derive(Clone)]
pub(crate) struct Partitions {
    pub users: Partition,
    pub user_emails: Partition,
    pub documents: Partition,
    pub owner_documents: Partition,
    pub uploads: Partition,
    pub signed: Partition,
}

/// Storage engine wrapping a fjall keyspace
#[derive(Clone)]
pub struct StorageEngine {
    keyspace: Arc<Keyspace>,
    partitions: Partitions,
    commit_lock: Arc<Mutex<()>>,
    ids: Arc<Mutex<ulid::Generator>>,
}

impl StorageEngine {
    /// Open (or create) a storage engine at the given path
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let keyspace = Config::new(path)
            .open()
            .map_err(|e| DocSignError::Storage(e.to_string()))?;

        let open = |name: &str| -> Result<Partition> {
            keyspace
                .open_partition(name, PartitionCreateOptions::default())
                .map_err(|e| DocSignError::Storage(e.to_string()))
        };

        let partitions = Partitions {
            users: open("users")?,
            user_emails: open("user_emails")?,
            documents: open("documents")?,
            owner_documents: open("owner_documents")?,
            uploads: open("uploads")?,
            signed: open("signed")?,
        };

        Ok(StorageEngine {
            keyspace: Arc::new(keyspace),
            partitions,
            commit_lock: Arc::new(Mutex::new(())),
            ids: Arc::new(Mutex::new(ulid::Generator::new())),
        })
    }

    /// Create temporary storage engine for testing
    #[cfg(any(test, feature = "test-utils"))]
    pub fn temp() -> Result<(Self, tempfile::TempDir)> {
        let temp_dir = tempfile::tempdir()?;
        let engine = Self::new(temp_dir.path())?;
        Ok((engine, temp_dir))
    }

    pub(crate) fn partitions(&self) -> &Partitions {
        &self.partitions
    }

    pub(crate) fn commit_lock(&self) -> &Mutex<()> {
        &self.commit_lock
    }

    /// Begin a unit of work; nothing is written until it commits
    pub fn unit_of_work(&self) -> UnitOfWork<'_> {
        let batch = self.keyspace.batch().durability(Some(PersistMode::SyncAll));
        UnitOfWork::new(self, batch)
    }

    /// Next id from the process-wide monotonic generator
    pub fn next_id(&self) -> Result<ulid::Ulid> {
        let mut generator = self
            .ids
            .lock()
            .map_err(|_| DocSignError::Internal("id generator lock poisoned".to_string()))?;

        generator
            .generate()
            .map_err(|e| DocSignError::Internal(format!("id generation failed: {}", e)))
    }

    /// Persist all changes to disk
    pub fn persist(&self) -> Result<()> {
        self.keyspace
            .persist(PersistMode::SyncAll)
            .map_err(|e| DocSignError::Storage(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_engine_creation() {
        let (engine, _temp) = StorageEngine::temp().unwrap();
        assert!(engine.persist().is_ok());
    }

    #[test]
    fn test_ids_are_monotonic() {
        let (engine, _temp) = StorageEngine::temp().unwrap();
        let ids: Vec<_> = (0..100).map(|_| engine.next_id().unwrap()).collect();

        for pair in ids.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_reopen_keeps_data() {
        let temp = tempfile::tempdir().unwrap();
        {
            let engine = StorageEngine::new(temp.path()).unwrap();
            let mut uow = engine.unit_of_work();
            uow.insert(&engine.partitions().users, "k", "v");
            uow.commit().unwrap();
        }

        let engine = StorageEngine::new(temp.path()).unwrap();
        let value = engine.partitions().users.get("k").unwrap().unwrap();
        assert_eq!(&*value, b"v");
    }
}
