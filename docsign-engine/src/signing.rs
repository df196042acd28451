//! Signing engine: mark the artifact, then advance the lifecycle

use crate::mark::apply_mark;
use crate::records::{document_key, get_json};
use crate::{DocumentRegistry, StorageEngine};
use docsign_core::*;
use tracing::{info, warn};

#[derive(Clone)]
pub struct SigningEngine {
    engine: StorageEngine,
    registry: DocumentRegistry,
}

impl SigningEngine {
    pub fn new(engine: StorageEngine, registry: DocumentRegistry) -> Self {
        SigningEngine { engine, registry }
    }

    /// Sign one of `owner`'s documents.
    ///
    /// The signed artifact and the updated record are committed together,
    /// and only if the stored record is still pending at commit time.
    pub fn sign(&self, owner: &UserId, id: &DocumentId) -> Result<Document> {
        let doc = self.registry.get(owner, id)?;
        if doc.status != DocumentStatus::Pending {
            return Err(DocSignError::AlreadySigned);
        }

        let original = self
            .registry
            .artifacts()
            .read(&doc.storage_location)
            .map_err(|e| signing_failed(id, e))?;

        let marked = apply_mark(&original).map_err(|e| signing_failed(id, e))?;

        let parts = self.engine.partitions();
        let mut uow = self.engine.unit_of_work();
        let signed_location = StorageLocation::signed(&doc.id, &doc.filename);
        let manifest = self
            .registry
            .artifacts()
            .stage_bytes(&mut uow, &signed_location, &marked)
            .map_err(|e| signing_failed(id, e))?;

        let signed = doc.into_signed(&manifest)?;
        uow.insert_json(&parts.documents, document_key(id), &signed)?;

        uow.commit_if(|engine| {
            let current: Option<Document> =
                get_json(&engine.partitions().documents, document_key(id))?;
            match current {
                Some(current) if current.status == DocumentStatus::Pending => Ok(()),
                Some(_) => Err(DocSignError::AlreadySigned),
                None => Err(DocSignError::NotFound),
            }
        })
        .map_err(|e| match e {
            DocSignError::AlreadySigned | DocSignError::NotFound => e,
            other => signing_failed(id, other),
        })?;

        info!(
            document_id = %id,
            owner = %owner,
            size = signed.size,
            "signed document"
        );
        Ok(signed)
    }
}

fn signing_failed(id: &DocumentId, err: impl std::fmt::Display) -> DocSignError {
    warn!(document_id = %id, error = %err, "signing failed");
    DocSignError::SigningFailed(err.to_string())
}
