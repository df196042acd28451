//! Password hashing with Argon2id

use crate::auth::constant_time_compare;
use crate::config::PasswordParams;
use crate::{DocSignError, Result};
use argon2::{Algorithm, Argon2, Version};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const PASSWORD_HASH_LEN: usize = 32;
pub const PASSWORD_SALT_LEN: usize = 16;

/// Stored Argon2id digest together with the parameters that produced it
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordDigest {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
    #[serde(with = "hex")]
    salt: Vec<u8>,
    #[serde(with = "hex")]
    hash: Vec<u8>,
}

impl PasswordDigest {
    fn params(&self) -> PasswordParams {
        PasswordParams {
            memory_kib: self.memory_kib,
            iterations: self.iterations,
            parallelism: self.parallelism,
        }
    }
}

impl fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordDigest")
            .field("memory_kib", &self.memory_kib)
            .field("iterations", &self.iterations)
            .field("parallelism", &self.parallelism)
            .finish_non_exhaustive()
    }
}

/// Derives and checks password digests
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: PasswordParams,
}

impl PasswordHasher {
    pub fn new(params: PasswordParams) -> Result<Self> {
        params.to_argon2()?;
        Ok(PasswordHasher { params })
    }

    /// Hash a password under a fresh random salt
    pub fn hash(&self, password: &str) -> Result<PasswordDigest> {
        let mut salt = vec![0u8; PASSWORD_SALT_LEN];
        OsRng.fill_bytes(&mut salt);

        let hash = derive(self.params, password.as_bytes(), &salt)?;

        Ok(PasswordDigest {
            memory_kib: self.params.memory_kib,
            iterations: self.params.iterations,
            parallelism: self.params.parallelism,
            salt,
            hash,
        })
    }

    /// Check a password against a stored digest in constant time
    pub fn verify(&self, password: &str, digest: &PasswordDigest) -> Result<bool> {
        let candidate = derive(digest.params(), password.as_bytes(), &digest.salt)?;
        Ok(constant_time_compare(&candidate, &digest.hash))
    }

    /// Spend one derivation without a stored digest.
    ///
    /// Used on the unknown-email path so it costs as much as a real check.
    pub fn dummy_verify(&self, password: &str) {
        let salt = [0u8; PASSWORD_SALT_LEN];
        std::hint::black_box(derive(self.params, password.as_bytes(), &salt)).ok();
    }
}

fn derive(params: PasswordParams, password: &[u8], salt: &[u8]) -> Result<Vec<u8>> {
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params.to_argon2()?);

    let mut out = vec![0u8; PASSWORD_HASH_LEN];
    argon2
        .hash_password_into(password, salt, &mut out)
        .map_err(|e| DocSignError::Internal(format!("password derivation failed: {}", e)))?;
    Ok(out)
}
