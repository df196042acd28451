//! Credential store: users and their password digests

use crate::records::{contains, get_json, user_key};
use crate::StorageEngine;
use chrono::Utc;
use docsign_core::auth::PasswordHasher;
use docsign_core::*;
use tracing::{debug, info};

#[derive(Clone)]
pub struct CredentialStore {
    engine: StorageEngine,
    hasher: PasswordHasher,
}

impl CredentialStore {
    pub fn new(engine: StorageEngine, params: PasswordParams) -> Result<Self> {
        Ok(CredentialStore {
            engine,
            hasher: PasswordHasher::new(params)?,
        })
    }

    /// Create a user. The email must not be registered yet.
    pub fn register(&self, email: &str, password: &str) -> Result<UserId> {
        let email = Email::new(email)?;
        if password.is_empty() {
            return Err(DocSignError::InvalidInput("empty password".to_string()));
        }

        let parts = self.engine.partitions();
        if contains(&parts.user_emails, email.as_str())? {
            return Err(DocSignError::DuplicateIdentity);
        }

        let user = User {
            id: UserId::from_ulid(self.engine.next_id()?),
            email,
            password_digest: self.hasher.hash(password)?,
            created_at: Utc::now(),
        };

        let mut uow = self.engine.unit_of_work();
        uow.insert_json(&parts.users, user_key(&user.id), &user)?;
        uow.insert(&parts.user_emails, user.email.as_str(), user_key(&user.id));

        let email_key = user.email.as_str().to_string();
        uow.commit_if(|engine| {
            if contains(&engine.partitions().user_emails, &email_key)? {
                return Err(DocSignError::DuplicateIdentity);
            }
            Ok(())
        })?;

        info!(user_id = %user.id, "registered user");
        Ok(user.id)
    }

    /// Check an email/password pair.
    ///
    /// Unknown email and wrong password both yield `AuthenticationFailed`.
    pub fn verify(&self, email: &str, password: &str) -> Result<User> {
        let Some(user) = self.find_by_email(email)? else {
            self.hasher.dummy_verify(password);
            debug!("login for unknown email");
            return Err(DocSignError::AuthenticationFailed);
        };

        if !self.hasher.verify(password, &user.password_digest)? {
            debug!(user_id = %user.id, "login with wrong password");
            return Err(DocSignError::AuthenticationFailed);
        }

        Ok(user)
    }

    pub fn find_by_id(&self, id: &UserId) -> Result<Option<User>> {
        get_json(&self.engine.partitions().users, user_key(id))
    }

    fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let parts = self.engine.partitions();
        let Some(raw_id) = crate::records::get_raw(&parts.user_emails, email)? else {
            return Ok(None);
        };

        let id: UserId = std::str::from_utf8(&raw_id)
            .map_err(|e| DocSignError::Storage(format!("corrupt email index: {}", e)))?
            .parse()
            .map_err(|e| DocSignError::Storage(format!("corrupt email index: {}", e)))?;

        self.find_by_id(&id)
    }
}
