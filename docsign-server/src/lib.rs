//! HTTP surface of the docsign service

pub mod config;
pub mod error;
pub mod handlers;
pub mod server;

pub use config::{Cli, LogFormat};
pub use error::ApiError;
pub use handlers::{handle_request, AppState};
pub use server::DocSignServer;
