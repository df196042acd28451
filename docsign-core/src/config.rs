//! Service configuration
//!
//! Built once at startup and passed by reference to every component.

use crate::{DocSignError, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_TOKEN_LEEWAY: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 25 * 1024 * 1024;

/// Token lifetime settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenConfig {
    pub ttl: Duration,
    /// Clock skew tolerated when checking expiry
    pub leeway: Duration,
}

impl Default for TokenConfig {
    fn default() -> Self {
        TokenConfig {
            ttl: DEFAULT_TOKEN_TTL,
            leeway: DEFAULT_TOKEN_LEEWAY,
        }
    }
}

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl PasswordParams {
    /// Cheapest parameters argon2 accepts. Tests only.
    pub const fn insecure_fast() -> Self {
        PasswordParams {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        }
    }

    pub(crate) fn to_argon2(self) -> Result<argon2::Params> {
        argon2::Params::new(
            self.memory_kib,
            self.iterations,
            self.parallelism,
            Some(crate::auth::PASSWORD_HASH_LEN),
        )
        .map_err(|e| DocSignError::InvalidConfig(format!("argon2 parameters: {}", e)))
    }
}

impl Default for PasswordParams {
    fn default() -> Self {
        PasswordParams {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

/// Everything the service needs to start
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub data_dir: PathBuf,
    pub token: TokenConfig,
    pub password: PasswordParams,
    pub max_upload_bytes: u64,
}

impl ServiceConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        ServiceConfig {
            data_dir: data_dir.into(),
            token: TokenConfig::default(),
            password: PasswordParams::default(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.token.ttl.is_zero() {
            return Err(DocSignError::InvalidConfig(
                "token ttl must be positive".to_string(),
            ));
        }

        if self.max_upload_bytes == 0 {
            return Err(DocSignError::InvalidConfig(
                "max upload size must be positive".to_string(),
            ));
        }

        self.password.to_argon2()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ServiceConfig::new("/tmp/docsign");
        assert!(config.validate().is_ok());
        assert_eq!(config.token.ttl, Duration::from_secs(1800));
        assert_eq!(config.max_upload_bytes, 25 * 1024 * 1024);
    }

    #[test]
    fn zero_ttl_rejected() {
        let mut config = ServiceConfig::new("/tmp/docsign");
        config.token.ttl = Duration::ZERO;
        assert!(matches!(config.validate(), Err(DocSignError::InvalidConfig(_))));
    }

    #[test]
    fn bad_argon2_params_rejected() {
        let mut config = ServiceConfig::new("/tmp/docsign");
        config.password = PasswordParams {
            memory_kib: 1,
            iterations: 1,
            parallelism: 1,
        };
        assert!(config.validate().is_err());

        config.password = PasswordParams::insecure_fast();
        assert!(config.validate().is_ok());
    }
}
