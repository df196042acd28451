//! Error types for docsign

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocSignError {
    #[error("Email already exists")]
    DuplicateIdentity,

    #[error("Invalid email or password")]
    AuthenticationFailed,

    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Deliberately carries no detail: a missing document and a document
    /// owned by someone else must be indistinguishable.
    #[error("Not found")]
    NotFound,

    #[error("Document already signed")]
    AlreadySigned,

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Payload too large: limit is {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DocSignError {
    /// True for failures caused by the caller rather than by the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            DocSignError::DuplicateIdentity
                | DocSignError::AuthenticationFailed
                | DocSignError::Unauthenticated
                | DocSignError::InvalidToken(_)
                | DocSignError::NotFound
                | DocSignError::AlreadySigned
                | DocSignError::InvalidInput(_)
                | DocSignError::PayloadTooLarge { .. }
        )
    }
}
