//! Wiring of the document services over one storage engine

use crate::{AuthGuard, CredentialStore, DocumentRegistry, SigningEngine, StorageEngine};
use docsign_core::auth::{IssuedToken, TokenKey, TokenService};
use docsign_core::*;
use std::sync::Arc;
use tracing::info;

/// Every service the HTTP layer needs, built once at startup
#[derive(Clone)]
pub struct DocSignServices {
    pub engine: StorageEngine,
    pub credentials: CredentialStore,
    pub tokens: Arc<TokenService>,
    pub guard: AuthGuard,
    pub registry: DocumentRegistry,
    pub signer: SigningEngine,
}

impl DocSignServices {
    /// Open the keyspace under `config.data_dir` and build the services
    pub fn open(config: &ServiceConfig, key: &TokenKey) -> Result<Self> {
        config.validate()?;
        let engine = StorageEngine::new(&config.data_dir)?;
        info!(data_dir = %config.data_dir.display(), key_id = %key.key_id(), "storage opened");
        Self::with_engine(engine, config, key)
    }

    pub fn with_engine(engine: StorageEngine, config: &ServiceConfig, key: &TokenKey) -> Result<Self> {
        let credentials = CredentialStore::new(engine.clone(), config.password)?;
        let tokens = Arc::new(TokenService::new(key, &config.token)?);
        let guard = AuthGuard::new(credentials.clone(), tokens.clone());
        let registry = DocumentRegistry::new(engine.clone(), config.max_upload_bytes);
        let signer = SigningEngine::new(engine.clone(), registry.clone());

        Ok(DocSignServices {
            engine,
            credentials,
            tokens,
            guard,
            registry,
            signer,
        })
    }

    /// Verify credentials and issue a token for the user
    pub fn login(&self, email: &str, password: &str) -> Result<(User, IssuedToken)> {
        let user = self.credentials.verify(email, password)?;
        let token = self.tokens.issue(&user.id.to_string())?;
        info!(user_id = %user.id, "login");
        Ok((user, token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestServices;

    #[test]
    fn login_issues_token_for_user() {
        let svc = TestServices::new();
        let id = svc.credentials.register("a@x.com", "pw1").unwrap();

        let (user, token) = svc.login("a@x.com", "pw1").unwrap();
        assert_eq!(user.id, id);

        let claims = svc.tokens.verify(&token.access_token).unwrap();
        assert_eq!(claims.subject, id.to_string());
    }

    #[test]
    fn login_with_bad_password_fails() {
        let svc = TestServices::new();
        svc.credentials.register("a@x.com", "pw1").unwrap();

        assert!(matches!(
            svc.login("a@x.com", "pw2"),
            Err(DocSignError::AuthenticationFailed)
        ));
    }

    #[test]
    fn open_creates_data_dir() {
        let temp = tempfile::tempdir().unwrap();
        let mut config = ServiceConfig::new(temp.path().join("data"));
        config.password = PasswordParams::insecure_fast();

        let svc = DocSignServices::open(&config, &TokenKey::generate()).unwrap();
        svc.credentials.register("a@x.com", "pw1").unwrap();
        assert!(temp.path().join("data").exists());
    }

    #[test]
    fn open_rejects_invalid_config() {
        let temp = tempfile::tempdir().unwrap();
        let mut config = ServiceConfig::new(temp.path());
        config.max_upload_bytes = 0;

        assert!(DocSignServices::open(&config, &TokenKey::generate()).is_err());
    }
}
