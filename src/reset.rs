//! Password reset tokens
//!
//! Per email there is at most one stored token. Issuing deletes any earlier
//! token for the email first. Consuming deletes the token, and so does
//! presenting one that is expired or already used. Expiry is checked lazily
//! at consumption time; nothing sweeps the table in the background.
//!
//! Consumption removes the record in a single store call, so of two
//! concurrent resets with the same token only one gets the record.

use crate::config::{self, AuthConfig, ResetTokenMode};
use crate::error::AuthError;
use crate::models::ResetTokenRecord;
use crate::password::CredentialHasher;
use crate::store::Store;

use chrono::{Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// A freshly generated token: the value to hand out plus the record to store
#[derive(Debug, Clone)]
pub struct IssuedResetToken {
    pub token: String,
    pub record: ResetTokenRecord,
}

/// Generates, looks up and invalidates reset tokens
pub struct ResetTokenManager {
    store: Arc<dyn Store>,
    salter: CredentialHasher,
    mode: ResetTokenMode,
    lifetime: Duration,
}

impl ResetTokenManager {
    pub fn new(store: Arc<dyn Store>, config: &AuthConfig) -> Result<Self, AuthError> {
        Ok(Self {
            store,
            salter: CredentialHasher::new(config.reset_token_cost)?,
            mode: config.reset_token_mode,
            lifetime: config::lifetime(config.reset_token_expiration)?,
        })
    }

    /// Mint a token for `email` without persisting it
    pub async fn generate(&self, email: &str) -> Result<IssuedResetToken, AuthError> {
        let token = match self.mode {
            ResetTokenMode::EmailDigest => self.salter.hash_blocking(email.to_string()).await?,
            ResetTokenMode::Random => {
                let mut bytes = [0u8; 32];
                rand::thread_rng().fill_bytes(&mut bytes);
                hex::encode(bytes)
            }
        };

        let expires_at = Utc::now().checked_add_signed(self.lifetime).ok_or_else(|| {
            tracing::error!("Reset token expiry is out of range");
            AuthError::Internal
        })?;

        let record = ResetTokenRecord {
            email: email.to_string(),
            token: self.lookup_key(&token),
            expires_at,
            used: false,
        };

        Ok(IssuedResetToken { token, record })
    }

    /// Stored key for a presented token
    pub fn lookup_key(&self, presented: &str) -> String {
        match self.mode {
            ResetTokenMode::EmailDigest => presented.to_string(),
            ResetTokenMode::Random => hex::encode(Sha256::digest(presented.as_bytes())),
        }
    }

    pub async fn lookup(&self, presented: &str) -> Result<Option<ResetTokenRecord>, AuthError> {
        Ok(self.store.find_reset_token(&self.lookup_key(presented)).await?)
    }

    /// Delete every stored token for `email`
    pub async fn invalidate_all_for(&self, email: &str) -> Result<u64, AuthError> {
        let removed = self.store.delete_reset_tokens_by_email(email).await?;
        if removed > 0 {
            tracing::debug!(email = %email, removed, "Invalidated reset tokens");
        }
        Ok(removed)
    }

    /// Replace any token for `email` with a new one and return the value to send
    ///
    /// If the insert fails after the old tokens were removed the email is left
    /// with no active token, which a later request repairs.
    pub async fn issue(&self, email: &str) -> Result<String, AuthError> {
        let issued = self.generate(email).await?;

        self.invalidate_all_for(email).await?;
        self.store.insert_reset_token(issued.record).await?;

        Ok(issued.token)
    }

    /// Consume a presented token, returning the record it belonged to
    pub async fn consume(&self, presented: &str) -> Result<ResetTokenRecord, AuthError> {
        let record = self
            .store
            .take_reset_token(&self.lookup_key(presented))
            .await?
            .ok_or(AuthError::ResetTokenNotFound)?;

        if !record.is_consumable() {
            tracing::info!(
                email = %record.email,
                used = record.used,
                "Rejected expired or used reset token"
            );
            self.invalidate_all_for(&record.email).await?;
            return Err(AuthError::TokenExpiredOrUsed);
        }

        self.invalidate_all_for(&record.email).await?;

        Ok(ResetTokenRecord {
            used: true,
            ..record
        })
    }
}
