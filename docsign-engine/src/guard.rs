//! Authorization guard: the one place a request becomes a principal

use crate::CredentialStore;
use docsign_core::auth::{extract_bearer_token, TokenService};
use docsign_core::*;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct AuthGuard {
    credentials: CredentialStore,
    tokens: Arc<TokenService>,
}

impl AuthGuard {
    pub fn new(credentials: CredentialStore, tokens: Arc<TokenService>) -> Self {
        AuthGuard {
            credentials,
            tokens,
        }
    }

    /// Resolve the acting user from an `Authorization` header value.
    ///
    /// Every token problem collapses to `Unauthenticated`. Storage errors
    /// are passed through untouched.
    pub fn resolve(&self, authorization: Option<&str>) -> Result<User> {
        let token = authorization
            .and_then(extract_bearer_token)
            .ok_or_else(|| {
                debug!("missing or malformed authorization header");
                DocSignError::Unauthenticated
            })?;

        let claims = self.tokens.verify(token).map_err(|e| {
            debug!(error = %e, "token rejected");
            DocSignError::Unauthenticated
        })?;

        let user_id: UserId = claims.subject.parse().map_err(|_| {
            debug!("token subject is not a user id");
            DocSignError::Unauthenticated
        })?;

        match self.credentials.find_by_id(&user_id)? {
            Some(user) => Ok(user),
            None => {
                debug!(user_id = %user_id, "token subject has no user");
                Err(DocSignError::Unauthenticated)
            }
        }
    }
}
