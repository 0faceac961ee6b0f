//! Authentication Middleware
//!
//! Bearer token verification for protected routes. The token's subject is
//! re-fetched from the store on every request, so deleted accounts lose
//! access even while their tokens are unexpired.

use crate::error::AuthError;
use crate::extractors::AuthUser;
use crate::handlers::AuthState;
use crate::token::bearer_token;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

/// Require authenticated user
///
/// Stores the resolved [`AuthUser`] in request extensions for extractors.
pub async fn require_auth(
    State(auth): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(bearer_token)
        .ok_or(AuthError::Unauthenticated)?;

    let user = auth.authenticate(token).await?;

    req.extensions_mut().insert(AuthUser::from(user));

    Ok(next.run(req).await)
}
