//! Core data types for docsign

use crate::auth::PasswordDigest;
use crate::{DocSignError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const MAX_EMAIL_LEN: usize = 254;
const MAX_FILENAME_LEN: usize = 255;

/// Unique user identifier, assigned at registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(ulid::Ulid);

impl UserId {
    pub fn from_ulid(ulid: ulid::Ulid) -> Self {
        UserId(ulid)
    }

    pub fn as_ulid(&self) -> ulid::Ulid {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = DocSignError;

    fn from_str(s: &str) -> Result<Self> {
        ulid::Ulid::from_string(s)
            .map(UserId)
            .map_err(|e| DocSignError::InvalidInput(format!("invalid user id: {}", e)))
    }
}

/// Registry-assigned document identifier
///
/// ULIDs sort by creation time, which gives per-owner listings their
/// insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentId(ulid::Ulid);

impl DocumentId {
    pub fn from_ulid(ulid: ulid::Ulid) -> Self {
        DocumentId(ulid)
    }

    pub fn as_ulid(&self) -> ulid::Ulid {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DocumentId {
    type Err = DocSignError;

    fn from_str(s: &str) -> Result<Self> {
        ulid::Ulid::from_string(s)
            .map(DocumentId)
            .map_err(|e| DocSignError::InvalidInput(format!("invalid document id: {}", e)))
    }
}

/// User email, compared case-sensitively exactly as stored
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Email(String);

impl Email {
    /// Create an email with validation
    pub fn new(email: &str) -> Result<Self> {
        if email.is_empty() {
            return Err(DocSignError::InvalidInput("empty email".to_string()));
        }

        if email.len() > MAX_EMAIL_LEN {
            return Err(DocSignError::InvalidInput("email too long".to_string()));
        }

        if email.chars().any(|c| c.is_control() || c.is_whitespace()) {
            return Err(DocSignError::InvalidInput(
                "email must not contain whitespace or control characters".to_string(),
            ));
        }

        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
            _ => {
                return Err(DocSignError::InvalidInput(format!(
                    "'{}' is not an email address",
                    email
                )))
            }
        }

        Ok(Email(email.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Client-supplied file name, reduced to its final path component
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Filename(String);

impl Filename {
    /// Sanitize and validate an uploaded file name
    pub fn new(raw: &str) -> Result<Self> {
        let name = raw
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default()
            .trim();

        if name.is_empty() || name == "." || name == ".." {
            return Err(DocSignError::InvalidInput("missing file name".to_string()));
        }

        if name.len() > MAX_FILENAME_LEN {
            return Err(DocSignError::InvalidInput("file name too long".to_string()));
        }

        if name.chars().any(|c| c.is_control()) {
            return Err(DocSignError::InvalidInput(
                "control characters not allowed in file name".to_string(),
            ));
        }

        Ok(Filename(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Filename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Document lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Signed,
}

impl DocumentStatus {
    /// Transitions are monotonic: pending -> signed, nothing else.
    pub fn can_transition_to(self, next: DocumentStatus) -> bool {
        matches!((self, next), (DocumentStatus::Pending, DocumentStatus::Signed))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentStatus::Pending => "pending",
            DocumentStatus::Signed => "signed",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two logical artifact areas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactArea {
    Uploads,
    Signed,
}

impl ArtifactArea {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactArea::Uploads => "uploads",
            ArtifactArea::Signed => "signed",
        }
    }
}

/// Where an artifact lives: an area plus a collision-free key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageLocation {
    pub area: ArtifactArea,
    pub key: String,
}

impl StorageLocation {
    /// Location of an original upload
    pub fn upload(id: &DocumentId, filename: &Filename) -> Self {
        StorageLocation {
            area: ArtifactArea::Uploads,
            key: format!("{}-{}", id, filename),
        }
    }

    /// Location of a signed output
    pub fn signed(id: &DocumentId, filename: &Filename) -> Self {
        StorageLocation {
            area: ArtifactArea::Signed,
            key: format!("{}-{}", id, filename),
        }
    }
}

impl fmt::Display for StorageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.area.as_str(), self.key)
    }
}

/// Content hash for integrity verification
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(#[serde(with = "hex::serde")] [u8; 32]);

impl ContentHash {
    /// Create hash from data using BLAKE3
    pub fn new(data: &[u8]) -> Self {
        ContentHash(blake3::hash(data).into())
    }

    pub fn from_hasher(hasher: &blake3::Hasher) -> Self {
        ContentHash(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// Chunk layout of a stored artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub size: u64,
    pub chunk_count: u32,
    pub content_hash: ContentHash,
}

/// A registered user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub password_digest: PasswordDigest,
    pub created_at: DateTime<Utc>,
}

/// Document metadata record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub filename: Filename,
    pub storage_location: StorageLocation,
    pub status: DocumentStatus,
    pub owner_id: UserId,
    pub size: u64,
    pub content_hash: ContentHash,
    pub created_at: DateTime<Utc>,
    pub signed_at: Option<DateTime<Utc>>,
}

impl Document {
    /// Create a freshly uploaded, pending document
    pub fn new_pending(
        id: DocumentId,
        owner_id: UserId,
        filename: Filename,
        manifest: &ArtifactManifest,
    ) -> Self {
        let storage_location = StorageLocation::upload(&id, &filename);
        Document {
            id,
            filename,
            storage_location,
            status: DocumentStatus::Pending,
            owner_id,
            size: manifest.size,
            content_hash: manifest.content_hash.clone(),
            created_at: Utc::now(),
            signed_at: None,
        }
    }

    /// Produce the signed successor of this record
    pub fn into_signed(self, manifest: &ArtifactManifest) -> Result<Self> {
        if !self.status.can_transition_to(DocumentStatus::Signed) {
            return Err(DocSignError::AlreadySigned);
        }

        let storage_location = StorageLocation::signed(&self.id, &self.filename);
        Ok(Document {
            storage_location,
            status: DocumentStatus::Signed,
            size: manifest.size,
            content_hash: manifest.content_hash.clone(),
            signed_at: Some(Utc::now()),
            ..self
        })
    }
}

/// Client-facing view of a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: DocumentId,
    pub filename: String,
    pub status: DocumentStatus,
    pub user_id: UserId,
    pub size: u64,
    pub created_at: DateTime<Utc>,
    pub signed_at: Option<DateTime<Utc>>,
}

impl From<&Document> for DocumentSummary {
    fn from(doc: &Document) -> Self {
        DocumentSummary {
            id: doc.id,
            filename: doc.filename.as_str().to_string(),
            status: doc.status,
            user_id: doc.owner_id,
            size: doc.size,
            created_at: doc.created_at,
            signed_at: doc.signed_at,
        }
    }
}

/// Artifact bytes plus the headers a download needs
#[derive(Debug, Clone)]
pub struct DownloadedArtifact {
    pub bytes: Vec<u8>,
    pub filename: Filename,
    pub content_type: &'static str,
}
