//! Authentication Error Types
//!
//! Centralized error handling for all authentication operations.
//! Infrastructure failures are logged in full here and reported to callers
//! without internal detail.

use crate::store::{StoreError, UniqueField};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Authentication errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    #[error("Validation error: {0}")]
    Validation(String),

    /// The colliding field is kept for logging only.
    #[error("Email or nick name is already in use")]
    DuplicateCredential(UniqueField),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("The reset token is invalid or has already been used")]
    ResetTokenNotFound,

    #[error("The reset token is invalid or has already been used")]
    TokenExpiredOrUsed,

    #[error("Store error: {0}")]
    Store(String),

    #[error("Mail error: {0}")]
    Mail(String),

    #[error("Hashing failed")]
    Hashing,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error")]
    Internal,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            AuthError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "validation_error", msg.clone())
            }
            AuthError::DuplicateCredential(_) => (
                StatusCode::CONFLICT,
                "duplicate_credential",
                self.to_string(),
            ),
            AuthError::InvalidCredentials => (
                StatusCode::BAD_REQUEST,
                "invalid_credentials",
                self.to_string(),
            ),
            AuthError::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, "unauthorized", self.to_string())
            }
            AuthError::ResetTokenNotFound | AuthError::TokenExpiredOrUsed => (
                StatusCode::BAD_REQUEST,
                "invalid_reset_token",
                self.to_string(),
            ),
            AuthError::Store(_)
            | AuthError::Mail(_)
            | AuthError::Hashing
            | AuthError::Config(_)
            | AuthError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "An internal error occurred".to_string(),
            ),
        };

        (
            status,
            Json(serde_json::json!({
                "error": error_code,
                "message": message
            })),
        )
            .into_response()
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(field) => {
                tracing::info!(field = %field, "Unique constraint violated");
                AuthError::DuplicateCredential(field)
            }
            StoreError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                AuthError::Store(e.to_string())
            }
        }
    }
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(err: argon2::password_hash::Error) -> Self {
        tracing::error!("Password hashing error: {:?}", err);
        AuthError::Hashing
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        tracing::debug!("JWT error: {:?}", err);
        AuthError::Unauthenticated
    }
}

impl From<tokio::task::JoinError> for AuthError {
    fn from(err: tokio::task::JoinError) -> Self {
        tracing::error!("Blocking task failed: {:?}", err);
        AuthError::Internal
    }
}
