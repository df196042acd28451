//! Core data models, configuration and auth primitives for docsign

pub mod auth;
pub mod config;
pub mod error;
pub mod types;

pub use config::*;
pub use error::*;
pub use types::*;

/// Result type alias for docsign operations
pub type Result<T> = std::result::Result<T, DocSignError>;
