//! Persistence interface
//!
//! The authentication flows only talk to storage through [`Store`]. Uniqueness
//! of email (case-insensitive) and nick is the store's responsibility; the
//! single-active-reset-token rule is enforced by the callers.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::models::{NewUser, ResetTokenRecord, SearchField, User, UserSummary};

use async_trait::async_trait;
use std::fmt;

/// Field whose uniqueness constraint was violated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Email,
    Nick,
}

impl fmt::Display for UniqueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UniqueField::Email => write!(f, "email"),
            UniqueField::Nick => write!(f, "nick"),
        }
    }
}

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("duplicate {0}")]
    UniqueViolation(UniqueField),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Narrow query interface used by the authentication flows
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a user and return its generated ID
    async fn insert_user(&self, user: NewUser) -> StoreResult<i64>;

    /// Find a user by email, ignoring case
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Find a user by ID
    async fn find_user_by_id(&self, id: i64) -> StoreResult<Option<User>>;

    /// Users whose `field` contains `value`
    async fn search_users(&self, field: SearchField, value: &str) -> StoreResult<Vec<UserSummary>>;

    /// Persist a reset token record
    async fn insert_reset_token(&self, record: ResetTokenRecord) -> StoreResult<()>;

    /// Delete every reset token for an email; returns how many were removed
    async fn delete_reset_tokens_by_email(&self, email: &str) -> StoreResult<u64>;

    /// Find a reset token by its stored value
    async fn find_reset_token(&self, token: &str) -> StoreResult<Option<ResetTokenRecord>>;

    /// Remove a reset token by its stored value and return it
    ///
    /// At most one caller receives a given record.
    async fn take_reset_token(&self, token: &str) -> StoreResult<Option<ResetTokenRecord>>;

    /// Flag every reset token for an email as used
    async fn mark_reset_token_used(&self, email: &str) -> StoreResult<()>;
}
