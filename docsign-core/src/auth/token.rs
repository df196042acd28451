//! Bearer token issuance and verification
//!
//! Tokens are EdDSA JWTs carrying the user id as subject. They are
//! stateless: verification needs only the token bytes and the public key.

use crate::auth::TokenKey;
use crate::config::TokenConfig;
use crate::{DocSignError, Result};
use chrono::{DateTime, TimeZone, Utc};
use jwt_simple::prelude::*;
use std::collections::HashSet;

/// Issuer claim stamped on every token
pub const TOKEN_ISSUER: &str = "docsign";

/// A freshly issued access token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Claims recovered from a verified token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub subject: String,
    pub issued_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Issues and verifies time-bounded bearer tokens
pub struct TokenService {
    key_pair: Ed25519KeyPair,
    public_key: Ed25519PublicKey,
    ttl: Duration,
    leeway: Duration,
}

impl TokenService {
    pub fn new(key: &TokenKey, config: &TokenConfig) -> Result<Self> {
        let key_pair = Ed25519KeyPair::from_bytes(&key.keypair_bytes())
            .map_err(|e| DocSignError::InvalidConfig(format!("token key conversion failed: {}", e)))?
            .with_key_id(key.key_id().as_str());
        let public_key = key_pair.public_key();

        Ok(TokenService {
            key_pair,
            public_key,
            ttl: Duration::from_secs(config.ttl.as_secs()),
            leeway: Duration::from_secs(config.leeway.as_secs()),
        })
    }

    /// Sign a token for `subject`, valid for the configured lifetime
    pub fn issue(&self, subject: &str) -> Result<IssuedToken> {
        let claims = Claims::create(self.ttl)
            .with_subject(subject)
            .with_issuer(TOKEN_ISSUER);
        let expires_at = claims.expires_at.and_then(to_datetime);

        let access_token = self
            .key_pair
            .sign(claims)
            .map_err(|e| DocSignError::Internal(format!("token signing failed: {}", e)))?;

        let expires_at = expires_at
            .ok_or_else(|| DocSignError::Internal("issued token has no expiry".to_string()))?;

        Ok(IssuedToken {
            access_token,
            expires_at,
        })
    }

    /// Verify signature, issuer and expiry, and return the claims
    pub fn verify(&self, token: &str) -> Result<TokenClaims> {
        let options = VerificationOptions {
            time_tolerance: Some(self.leeway),
            allowed_issuers: Some(HashSet::from_iter([TOKEN_ISSUER.to_string()])),
            ..Default::default()
        };

        let claims = self
            .public_key
            .verify_token::<NoCustomClaims>(token, Some(options))
            .map_err(|e| DocSignError::InvalidToken(e.to_string()))?;

        let subject = claims
            .subject
            .filter(|s| !s.is_empty())
            .ok_or_else(|| DocSignError::InvalidToken("missing subject".to_string()))?;

        Ok(TokenClaims {
            subject,
            issued_at: claims.issued_at.and_then(to_datetime),
            expires_at: claims.expires_at.and_then(to_datetime),
        })
    }
}

fn to_datetime(ts: UnixTimeStamp) -> Option<DateTime<Utc>> {
    let secs = i64::try_from(ts.as_secs()).ok()?;
    Utc.timestamp_opt(secs, 0).single()
}
