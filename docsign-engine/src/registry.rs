//! Document registry: owner-scoped document metadata and artifacts

use crate::records::{document_key, get_json, get_raw, owner_index_key, owner_prefix, scan_values};
use crate::{ArtifactStore, StorageEngine};
use docsign_core::*;
use std::io::Read;
use tracing::{debug, info};

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

#[derive(Clone)]
pub struct DocumentRegistry {
    engine: StorageEngine,
    artifacts: ArtifactStore,
    max_upload_bytes: u64,
}

impl DocumentRegistry {
    pub fn new(engine: StorageEngine, max_upload_bytes: u64) -> Self {
        let artifacts = ArtifactStore::new(engine.clone());
        DocumentRegistry {
            engine,
            artifacts,
            max_upload_bytes,
        }
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Store a new artifact and its pending record in one batch
    pub fn upload(&self, owner: &UserId, filename: &str, content: impl Read) -> Result<DocumentId> {
        let filename = Filename::new(filename)?;
        let id = DocumentId::from_ulid(self.engine.next_id()?);
        let location = StorageLocation::upload(&id, &filename);
        let parts = self.engine.partitions();

        let mut uow = self.engine.unit_of_work();
        let manifest = self
            .artifacts
            .stage(&mut uow, &location, content, self.max_upload_bytes)?;

        let doc = Document::new_pending(id, *owner, filename, &manifest);
        uow.insert_json(&parts.documents, document_key(&id), &doc)?;
        uow.insert(&parts.owner_documents, owner_index_key(owner, &id), document_key(&id));
        uow.commit()?;

        info!(
            document_id = %id,
            owner = %owner,
            size = manifest.size,
            "uploaded document"
        );
        Ok(id)
    }

    /// All documents owned by `owner`, oldest first
    pub fn list_for(&self, owner: &UserId) -> Result<Vec<Document>> {
        let parts = self.engine.partitions();
        let mut docs = Vec::new();

        for raw_id in scan_values(&parts.owner_documents, &owner_prefix(owner))? {
            let doc: Option<Document> = get_json(&parts.documents, &raw_id)?;
            match doc {
                Some(doc) if doc.owner_id == *owner => docs.push(doc),
                _ => {
                    return Err(DocSignError::Storage(format!(
                        "owner index points at missing document {}",
                        String::from_utf8_lossy(&raw_id)
                    )))
                }
            }
        }

        Ok(docs)
    }

    /// Owner-scoped lookup.
    ///
    /// Absent and foreign ids are indistinguishable.
    pub fn get(&self, owner: &UserId, id: &DocumentId) -> Result<Document> {
        let parts = self.engine.partitions();

        if get_raw(&parts.owner_documents, owner_index_key(owner, id))?.is_none() {
            debug!(document_id = %id, owner = %owner, "document not visible to owner");
            return Err(DocSignError::NotFound);
        }

        let doc: Document = get_json(&parts.documents, document_key(id))?
            .ok_or(DocSignError::NotFound)?;

        if doc.owner_id != *owner {
            return Err(DocSignError::NotFound);
        }

        Ok(doc)
    }

    /// The document's current artifact with download metadata
    pub fn download(&self, owner: &UserId, id: &DocumentId) -> Result<DownloadedArtifact> {
        let doc = self.get(owner, id)?;
        let bytes = self.artifacts.read(&doc.storage_location)?;

        debug!(document_id = %id, size = bytes.len(), "download");
        Ok(DownloadedArtifact {
            bytes,
            filename: doc.filename,
            content_type: PDF_CONTENT_TYPE,
        })
    }
}

/// Parse a client-supplied document id; unparsable ids are simply not found
pub fn parse_document_id(raw: &str) -> Result<DocumentId> {
    raw.parse().map_err(|_| DocSignError::NotFound)
}
