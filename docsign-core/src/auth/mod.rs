//! Authentication primitives
//!
//! - Ed25519 token keys and EdDSA bearer tokens
//! - Argon2id password digests
//! - Constant-time comparisons

pub mod bearer;
pub mod keys;
pub mod password;
pub mod timing;
pub mod token;

pub use bearer::*;
pub use keys::*;
pub use password::*;
pub use timing::*;
pub use token::*;
