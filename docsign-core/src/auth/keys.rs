//! Ed25519 token signing keys
//!
//! The service holds exactly one key pair, derived from a 32-byte seed at
//! startup. Tokens are verified against its public half.

use crate::{DocSignError, Result};
use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use std::fmt;

/// Process-wide token signing key
#[derive(Clone)]
pub struct TokenKey {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl TokenKey {
    /// Generate an ephemeral key; tokens die with the process
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let verifying_key = signing_key.verifying_key();

        TokenKey {
            signing_key,
            verifying_key,
        }
    }

    /// Create a key from a 32-byte seed
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        let verifying_key = signing_key.verifying_key();

        TokenKey {
            signing_key,
            verifying_key,
        }
    }

    /// Create a key from a hex-encoded seed
    pub fn from_hex_seed(seed: &str) -> Result<Self> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(seed.trim(), &mut bytes).map_err(|e| {
            DocSignError::InvalidConfig(format!("token seed must be 64 hex characters: {}", e))
        })?;
        Ok(Self::from_seed(&bytes))
    }

    /// Secret and public halves concatenated, the layout jwt-simple expects
    pub fn keypair_bytes(&self) -> [u8; 64] {
        let mut full_key = [0u8; 64];
        full_key[..32].copy_from_slice(&self.signing_key.to_bytes());
        full_key[32..].copy_from_slice(&self.verifying_key.to_bytes());
        full_key
    }

    pub fn verifying_key_bytes(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    /// Identifier published in the token header
    pub fn key_id(&self) -> KeyId {
        KeyId::from_verifying_key(&self.verifying_key)
    }
}

impl fmt::Debug for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenKey")
            .field("key_id", &self.key_id())
            .finish_non_exhaustive()
    }
}

/// Unique identifier for a token key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyId(String);

impl KeyId {
    /// BLAKE3 of the public key bytes, first 16 bytes as hex
    pub fn from_verifying_key(verifying_key: &VerifyingKey) -> Self {
        let hash = blake3::hash(&verifying_key.to_bytes());
        KeyId(hex::encode(&hash.as_bytes()[..16]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
