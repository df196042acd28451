//! Artifact areas over fjall partitions
//!
//! Each artifact is a manifest plus fixed-size chunks:
//!
//! ```text
//! m:<key>            -> ArtifactManifest (JSON)
//! c:<key>:<index>    -> chunk bytes
//! ```
//!
//! Chunk indices are zero-padded so a scan returns them in order.

use crate::records::get_json;
use crate::{StorageEngine, UnitOfWork};
use docsign_core::auth::constant_time_hash_compare;
use docsign_core::*;
use fjall::Partition;
use std::io::{ErrorKind, Read};

/// Chunk size for stored artifacts
pub const ARTIFACT_CHUNK_SIZE: usize = 1024 * 1024;

/// Reads and stages artifacts in the `uploads` and `signed` areas
#[derive(Clone)]
pub struct ArtifactStore {
    engine: StorageEngine,
}

impl ArtifactStore {
    pub fn new(engine: StorageEngine) -> Self {
        ArtifactStore { engine }
    }

    fn partition(&self, area: ArtifactArea) -> &Partition {
        match area {
            ArtifactArea::Uploads => &self.engine.partitions().uploads,
            ArtifactArea::Signed => &self.engine.partitions().signed,
        }
    }

    /// Stream `content` into `uow` under `location`.
    ///
    /// Fails with `PayloadTooLarge` once more than `limit` bytes have been
    /// read.
    pub fn stage(
        &self,
        uow: &mut UnitOfWork<'_>,
        location: &StorageLocation,
        mut content: impl Read,
        limit: u64,
    ) -> Result<ArtifactManifest> {
        let partition = self.partition(location.area).clone();
        let mut hasher = blake3::Hasher::new();
        let mut buf = vec![0u8; ARTIFACT_CHUNK_SIZE];
        let mut size = 0u64;
        let mut chunk_count = 0u32;

        loop {
            let n = fill_chunk(&mut content, &mut buf)?;
            if n == 0 {
                break;
            }

            size += n as u64;
            if size > limit {
                return Err(DocSignError::PayloadTooLarge { limit });
            }

            hasher.update(&buf[..n]);
            uow.insert(&partition, chunk_key(&location.key, chunk_count), &buf[..n]);
            chunk_count += 1;

            if n < buf.len() {
                break;
            }
        }

        let manifest = ArtifactManifest {
            size,
            chunk_count,
            content_hash: ContentHash::from_hasher(&hasher),
        };
        uow.insert_json(&partition, manifest_key(&location.key), &manifest)?;

        Ok(manifest)
    }

    /// Stage an in-memory artifact
    pub fn stage_bytes(
        &self,
        uow: &mut UnitOfWork<'_>,
        location: &StorageLocation,
        data: &[u8],
    ) -> Result<ArtifactManifest> {
        self.stage(uow, location, data, data.len() as u64)
    }

    pub fn manifest(&self, location: &StorageLocation) -> Result<Option<ArtifactManifest>> {
        get_json(self.partition(location.area), manifest_key(&location.key))
    }

    /// Read an artifact back, verifying its size and hash
    pub fn read(&self, location: &StorageLocation) -> Result<Vec<u8>> {
        let manifest = self.manifest(location)?.ok_or_else(|| {
            DocSignError::Storage(format!("missing artifact manifest: {}", location))
        })?;

        let partition = self.partition(location.area);
        let capacity = usize::try_from(manifest.size).unwrap_or(0);
        let mut data = Vec::with_capacity(capacity);

        for index in 0..manifest.chunk_count {
            match partition.get(chunk_key(&location.key, index)) {
                Ok(Some(chunk)) => data.extend_from_slice(&chunk),
                Ok(None) => {
                    return Err(DocSignError::Storage(format!(
                        "missing chunk {} of {}",
                        index, location
                    )))
                }
                Err(e) => return Err(DocSignError::Storage(e.to_string())),
            }
        }

        if data.len() as u64 != manifest.size {
            return Err(DocSignError::Storage(format!(
                "size mismatch for {}: expected {}, read {}",
                location,
                manifest.size,
                data.len()
            )));
        }

        let actual = ContentHash::new(&data);
        if !constant_time_hash_compare(actual.as_bytes(), manifest.content_hash.as_bytes()) {
            return Err(DocSignError::Storage(format!(
                "content hash mismatch for {}",
                location
            )));
        }

        Ok(data)
    }
}

fn manifest_key(key: &str) -> String {
    format!("m:{}", key)
}

fn chunk_key(key: &str, index: u32) -> String {
    format!("c:{}:{:08}", key, index)
}

/// Read until `buf` is full or the reader is exhausted
fn fill_chunk(reader: &mut impl Read, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(key: &str) -> StorageLocation {
        StorageLocation {
            area: ArtifactArea::Uploads,
            key: key.to_string(),
        }
    }

    #[test]
    fn small_artifact_roundtrip() {
        let (engine, _temp) = StorageEngine::temp().unwrap();
        let store = ArtifactStore::new(engine.clone());
        let loc = location("small");

        let mut uow = engine.unit_of_work();
        let manifest = store.stage_bytes(&mut uow, &loc, b"Hello, world!").unwrap();
        uow.commit().unwrap();

        assert_eq!(manifest.size, 13);
        assert_eq!(manifest.chunk_count, 1);
        assert_eq!(store.read(&loc).unwrap(), b"Hello, world!");
    }

    #[test]
    fn large_artifact_is_chunked() {
        let (engine, _temp) = StorageEngine::temp().unwrap();
        let store = ArtifactStore::new(engine.clone());
        let loc = location("large");
        let data: Vec<u8> = (0..ARTIFACT_CHUNK_SIZE * 2 + 17)
            .map(|i| (i % 251) as u8)
            .collect();

        let mut uow = engine.unit_of_work();
        let manifest = store
            .stage(&mut uow, &loc, data.as_slice(), u64::MAX)
            .unwrap();
        uow.commit().unwrap();

        assert_eq!(manifest.chunk_count, 3);
        assert_eq!(manifest.content_hash, ContentHash::new(&data));
        assert_eq!(store.read(&loc).unwrap(), data);
    }

    #[test]
    fn exact_multiple_of_chunk_size() {
        let (engine, _temp) = StorageEngine::temp().unwrap();
        let store = ArtifactStore::new(engine.clone());
        let loc = location("exact");
        let data = vec![7u8; ARTIFACT_CHUNK_SIZE];

        let mut uow = engine.unit_of_work();
        let manifest = store.stage_bytes(&mut uow, &loc, &data).unwrap();
        uow.commit().unwrap();

        assert_eq!(manifest.chunk_count, 1);
        assert_eq!(store.read(&loc).unwrap(), data);
    }

    #[test]
    fn empty_artifact() {
        let (engine, _temp) = StorageEngine::temp().unwrap();
        let store = ArtifactStore::new(engine.clone());
        let loc = location("empty");

        let mut uow = engine.unit_of_work();
        let manifest = store.stage_bytes(&mut uow, &loc, b"").unwrap();
        uow.commit().unwrap();

        assert_eq!(manifest.chunk_count, 0);
        assert!(store.read(&loc).unwrap().is_empty());
    }

    #[test]
    fn oversized_artifact_is_rejected() {
        let (engine, _temp) = StorageEngine::temp().unwrap();
        let store = ArtifactStore::new(engine.clone());
        let loc = location("big");

        let mut uow = engine.unit_of_work();
        let result = store.stage(&mut uow, &loc, &[1u8; 100][..], 99);
        assert!(matches!(
            result,
            Err(DocSignError::PayloadTooLarge { limit: 99 })
        ));
        drop(uow);

        assert!(store.manifest(&loc).unwrap().is_none());
    }

    #[test]
    fn corrupted_chunk_is_detected() {
        let (engine, _temp) = StorageEngine::temp().unwrap();
        let store = ArtifactStore::new(engine.clone());
        let loc = location("corrupt");

        let mut uow = engine.unit_of_work();
        store.stage_bytes(&mut uow, &loc, b"original bytes").unwrap();
        uow.commit().unwrap();

        let mut uow = engine.unit_of_work();
        uow.insert(&engine.partitions().uploads, chunk_key("corrupt", 0), b"tampered bytes");
        uow.commit().unwrap();

        assert!(matches!(store.read(&loc), Err(DocSignError::Storage(_))));
    }

    #[test]
    fn areas_are_separate() {
        let (engine, _temp) = StorageEngine::temp().unwrap();
        let store = ArtifactStore::new(engine.clone());
        let upload = location("same-key");
        let signed = StorageLocation {
            area: ArtifactArea::Signed,
            key: "same-key".to_string(),
        };

        let mut uow = engine.unit_of_work();
        store.stage_bytes(&mut uow, &upload, b"upload").unwrap();
        store.stage_bytes(&mut uow, &signed, b"signed").unwrap();
        uow.commit().unwrap();

        assert_eq!(store.read(&upload).unwrap(), b"upload");
        assert_eq!(store.read(&signed).unwrap(), b"signed");
    }
}
