//! Command-line and environment configuration

use clap::{Parser, ValueEnum};
use docsign_core::auth::TokenKey;
use docsign_core::*;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "docsign-server", version, about = "Document upload and signing service")]
pub struct Cli {
    /// Data directory path
    #[arg(long, env = "DOCSIGN_DATA_DIR", value_name = "PATH", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Bind address
    #[arg(long, env = "DOCSIGN_BIND", value_name = "ADDR", default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// Hex-encoded 32-byte seed for the token signing key.
    /// Without it a fresh key is generated and tokens die with the process.
    #[arg(long, env = "DOCSIGN_TOKEN_SEED", value_name = "HEX", hide_env_values = true)]
    pub token_seed: Option<String>,

    /// Token lifetime in seconds
    #[arg(long, env = "DOCSIGN_TOKEN_TTL_SECS", default_value_t = DEFAULT_TOKEN_TTL.as_secs())]
    pub token_ttl_secs: u64,

    /// Tolerated clock skew when checking token expiry, in seconds
    #[arg(long, env = "DOCSIGN_TOKEN_LEEWAY_SECS", default_value_t = DEFAULT_TOKEN_LEEWAY.as_secs())]
    pub token_leeway_secs: u64,

    /// Largest accepted upload in bytes
    #[arg(long, env = "DOCSIGN_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: u64,

    #[arg(long, env = "DOCSIGN_ARGON2_MEMORY_KIB", default_value_t = PasswordParams::default().memory_kib)]
    pub argon2_memory_kib: u32,

    #[arg(long, env = "DOCSIGN_ARGON2_ITERATIONS", default_value_t = PasswordParams::default().iterations)]
    pub argon2_iterations: u32,

    #[arg(long, env = "DOCSIGN_ARGON2_PARALLELISM", default_value_t = PasswordParams::default().parallelism)]
    pub argon2_parallelism: u32,

    /// Log output format
    #[arg(long, env = "DOCSIGN_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl Cli {
    /// Fold the flags into a validated service configuration
    pub fn service_config(&self) -> Result<ServiceConfig> {
        let config = ServiceConfig {
            data_dir: self.data_dir.clone(),
            token: TokenConfig {
                ttl: Duration::from_secs(self.token_ttl_secs),
                leeway: Duration::from_secs(self.token_leeway_secs),
            },
            password: PasswordParams {
                memory_kib: self.argon2_memory_kib,
                iterations: self.argon2_iterations,
                parallelism: self.argon2_parallelism,
            },
            max_upload_bytes: self.max_upload_bytes,
        };
        config.validate()?;
        Ok(config)
    }

    /// The configured token key, or `None` when no seed was given
    pub fn token_key(&self) -> Result<Option<TokenKey>> {
        self.token_seed
            .as_deref()
            .map(TokenKey::from_hex_seed)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["docsign-server"]).unwrap();
        let config = cli.service_config().unwrap();

        assert_eq!(cli.bind, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.token.ttl, Duration::from_secs(1800));
        assert_eq!(config.token.leeway, Duration::from_secs(5));
        assert_eq!(config.max_upload_bytes, 25 * 1024 * 1024);
        assert_eq!(cli.log_format, LogFormat::Pretty);
    }

    #[test]
    fn flags_override_defaults() {
        let seed = "ab".repeat(32);
        let cli = Cli::try_parse_from([
            "docsign-server",
            "--data-dir",
            "/var/lib/docsign",
            "--bind",
            "0.0.0.0:9000",
            "--token-seed",
            &seed,
            "--token-ttl-secs",
            "60",
            "--max-upload-bytes",
            "1024",
            "--log-format",
            "json",
        ])
        .unwrap();

        let config = cli.service_config().unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/docsign"));
        assert_eq!(config.token.ttl, Duration::from_secs(60));
        assert_eq!(config.max_upload_bytes, 1024);
        assert_eq!(cli.log_format, LogFormat::Json);
        assert!(cli.token_key().unwrap().is_some());
    }

    #[test]
    fn bad_seed_is_rejected() {
        let cli = Cli::try_parse_from(["docsign-server", "--token-seed", "xyz"]).unwrap();
        assert!(matches!(cli.token_key(), Err(DocSignError::InvalidConfig(_))));
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let cli = Cli::try_parse_from(["docsign-server", "--token-ttl-secs", "0"]).unwrap();
        assert!(cli.service_config().is_err());
    }

    #[test]
    fn bad_bind_address_fails_parsing() {
        assert!(Cli::try_parse_from(["docsign-server", "--bind", "nowhere"]).is_err());
    }
}
