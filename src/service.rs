//! Authentication Service
//!
//! Registration, login, forgot-password and reset-password flows over the
//! credential hasher, session tokens, reset tokens, the store and the mailer.
//! Each flow stops at its first failure.

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::mailer::{self, Mailer};
use crate::models::*;
use crate::password::CredentialHasher;
use crate::reset::ResetTokenManager;
use crate::store::Store;
use crate::token::SessionTokens;

use std::sync::Arc;
use validator::Validate;

/// Authentication service
pub struct AuthService {
    store: Arc<dyn Store>,
    mailer: Arc<dyn Mailer>,
    hasher: CredentialHasher,
    tokens: SessionTokens,
    reset_tokens: ResetTokenManager,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(
        config: AuthConfig,
        store: Arc<dyn Store>,
        mailer: Arc<dyn Mailer>,
    ) -> Result<Self, AuthError> {
        config.validate()?;

        Ok(Self {
            hasher: CredentialHasher::new(config.password_cost)?,
            tokens: SessionTokens::new(&config)?,
            reset_tokens: ResetTokenManager::new(store.clone(), &config)?,
            store,
            mailer,
        })
    }

    pub fn tokens(&self) -> &SessionTokens {
        &self.tokens
    }

    pub fn reset_tokens(&self) -> &ResetTokenManager {
        &self.reset_tokens
    }

    // ============================================
    // Registration
    // ============================================

    /// Register a new user and return its ID
    pub async fn register(&self, req: RegisterRequest) -> Result<i64, AuthError> {
        req.validate()
            .map_err(|e| AuthError::Validation(e.to_string()))?;

        let password_hash = self.hasher.hash_blocking(req.password).await?;

        let new_user = NewUser {
            first_name: req.first_name,
            last_name: req.last_name,
            email: req.email,
            nick: req.nick,
            password_hash,
            avatar: req.avatar,
        };
        let name = display_name(&new_user.first_name, &new_user.last_name);
        let email = new_user.email.clone();

        let id = self.store.insert_user(new_user).await?;
        tracing::info!(user_id = id, "User registered");

        mailer::dispatch(self.mailer.clone(), "welcome", move |m| async move {
            m.send_welcome(&email, &name).await
        });

        Ok(id)
    }

    // ============================================
    // Login
    // ============================================

    /// Check credentials and issue a session token
    ///
    /// An unknown email and a wrong password produce the same error.
    pub async fn login(&self, req: LoginRequest) -> Result<String, AuthError> {
        if req.validate().is_err() {
            return Err(AuthError::InvalidCredentials);
        }

        let user = self
            .store
            .find_user_by_email(&req.email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self
            .hasher
            .verify_blocking(req.password, user.password_hash.clone())
            .await?
        {
            tracing::debug!(user_id = user.id, "Password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.tokens.issue(user.id)?;
        tracing::info!(user_id = user.id, "User logged in");

        Ok(token)
    }

    // ============================================
    // Session verification
    // ============================================

    /// Resolve a bearer token to the current state of its user
    ///
    /// A subject that no longer exists is rejected the same way as a bad token.
    pub async fn authenticate(&self, token: &str) -> Result<User, AuthError> {
        let claims = self.tokens.verify(token)?;

        self.store
            .find_user_by_id(claims.sub)
            .await?
            .ok_or_else(|| {
                tracing::debug!(user_id = claims.sub, "Token subject no longer exists");
                AuthError::Unauthenticated
            })
    }

    // ============================================
    // Password Reset
    // ============================================

    /// Start a password reset
    ///
    /// Succeeds identically whether or not the email is registered. If the
    /// token cannot be stored the caller still sees success.
    pub async fn forgot_password(&self, req: ForgotPasswordRequest) -> Result<(), AuthError> {
        req.validate()
            .map_err(|e| AuthError::Validation(e.to_string()))?;

        let user = match self.store.find_user_by_email(&req.email).await? {
            Some(user) => user,
            None => {
                tracing::debug!("Password reset requested for unknown email");
                return Ok(());
            }
        };

        let token = match self.reset_tokens.issue(&user.email).await {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(user_id = user.id, error = %e, "Failed to issue reset token");
                return Ok(());
            }
        };
        tracing::info!(user_id = user.id, "Password reset token issued");

        let email = user.email;
        mailer::dispatch(self.mailer.clone(), "password_reset", move |m| async move {
            m.send_password_reset(&email, &token).await
        });

        Ok(())
    }

    /// Complete a password reset
    ///
    /// Consumes the token. The stored password is left unchanged.
    pub async fn reset_password(&self, token: &str) -> Result<(), AuthError> {
        let record = self.reset_tokens.consume(token).await?;
        tracing::info!(email = %record.email, "Password reset token consumed");
        Ok(())
    }

    // ============================================
    // User Lookup
    // ============================================

    pub async fn search_users(
        &self,
        field: SearchField,
        value: &str,
    ) -> Result<Vec<UserSummary>, AuthError> {
        if !is_searchable(value) {
            return Err(AuthError::Validation("Invalid query".to_string()));
        }
        Ok(self.store.search_users(field, value).await?)
    }
}
