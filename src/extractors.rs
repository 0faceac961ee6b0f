//! Authentication Extractors

use crate::error::AuthError;
use crate::models::User;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use serde::Serialize;

/// Authenticated user resolved by [`require_auth`](crate::middleware::require_auth)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub nick: String,
    pub avatar: Option<String>,
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            nick: user.nick,
            avatar: user.avatar,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::Unauthenticated)
    }
}
