//! Authentication HTTP Handlers
//!
//! REST API endpoints for authentication operations.

use crate::error::AuthError;
use crate::extractors::AuthUser;
use crate::middleware;
use crate::models::*;
use crate::service::AuthService;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    middleware as axum_middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Shared auth service state
pub type AuthState = Arc<AuthService>;

// ============================================
// Route Builder
// ============================================

/// Create authentication routes
pub fn create_routes(auth_service: Arc<AuthService>) -> Router {
    // Public routes (no authentication required)
    let public = Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", get(reset_password));

    // Protected routes (require authentication)
    let protected = Router::new()
        .route("/profile", get(profile))
        .route("/user", get(search_user))
        .layer(axum_middleware::from_fn_with_state(
            auth_service.clone(),
            middleware::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .with_state(auth_service)
}

// ============================================
// Registration / Login
// ============================================

/// POST /auth/register
pub async fn register(
    State(auth): State<AuthState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let id = auth.register(req).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User created".to_string(),
            id,
        }),
    ))
}

/// POST /auth/login
pub async fn login(
    State(auth): State<AuthState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let token = auth.login(req).await?;

    Ok(Json(LoginResponse {
        success: true,
        token,
    }))
}

// ============================================
// Password Reset
// ============================================

/// POST /auth/forgot-password
///
/// Always answers the same way to prevent email enumeration.
pub async fn forgot_password(
    State(auth): State<AuthState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, AuthError> {
    auth.forgot_password(req).await?;

    Ok(Json(MessageResponse::new("sent")))
}

/// GET /auth/reset-password?token=...
pub async fn reset_password(
    State(auth): State<AuthState>,
    Query(query): Query<ResetPasswordQuery>,
) -> Result<impl IntoResponse, AuthError> {
    auth.reset_password(&query.token).await?;

    Ok(Json(StatusResponse {
        status: "ok".to_string(),
    }))
}

// ============================================
// Authenticated
// ============================================

/// GET /profile
pub async fn profile(user: AuthUser) -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "You made it to the secure route",
        "user": user
    }))
}

/// GET /user?email=...|nick=...|id=...
///
/// Exactly one search parameter is accepted.
pub async fn search_user(
    State(auth): State<AuthState>,
    _user: AuthUser,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AuthError> {
    let invalid = || AuthError::Validation("Invalid query".to_string());

    if params.len() != 1 {
        return Err(invalid());
    }
    let (name, value) = params.iter().next().ok_or_else(invalid)?;
    let field = SearchField::from_param(name).ok_or_else(invalid)?;

    let result = auth.search_users(field, value).await?;

    Ok(Json(SearchResponse { result }))
}
