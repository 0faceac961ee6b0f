//! Authentication Models
//!
//! Data structures for authentication requests, responses, and stored records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidateEmail, ValidationError};

// ============================================
// Stored Records
// ============================================

/// User identity as stored
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub nick: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub avatar: Option<String>,
}

/// Fields for a user about to be inserted; the password is already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub nick: String,
    pub password_hash: String,
    pub avatar: Option<String>,
}

/// Public search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UserSummary {
    pub id: i64,
    pub nick: String,
}

/// Password reset token record
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct ResetTokenRecord {
    pub email: String,
    /// Stored lookup key
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
}

impl ResetTokenRecord {
    /// Check if token is expired
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    /// Check if token can still be consumed
    pub fn is_consumable(&self) -> bool {
        !self.used && !self.is_expired()
    }
}

/// Column a user search is run against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Email,
    Nick,
    Id,
}

impl SearchField {
    pub fn from_param(name: &str) -> Option<Self> {
        match name {
            "email" => Some(Self::Email),
            "nick" => Some(Self::Nick),
            "id" => Some(Self::Id),
            _ => None,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            SearchField::Email => "email",
            SearchField::Nick => "nick",
            SearchField::Id => "id",
        }
    }
}

// ============================================
// Request DTOs
// ============================================

/// Registration request
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 50, message = "First name must be 1-50 characters"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 50, message = "Last name must be 1-50 characters"))]
    pub last_name: String,

    #[validate(email(message = "Please enter a valid email id"))]
    pub email: String,

    #[validate(custom(function = "validate_password_strength"))]
    pub password: String,

    #[validate(custom(function = "validate_nick"))]
    pub nick: String,

    #[validate(length(max = 500, message = "Avatar reference is too long"))]
    pub avatar: Option<String>,
}

/// Login request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Password reset request (initiate)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Password reset query (complete)
#[derive(Debug, Clone, Deserialize)]
pub struct ResetPasswordQuery {
    pub token: String,
}

// ============================================
// Response DTOs
// ============================================

#[derive(Debug, Clone, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
}

/// Simple message response
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub result: Vec<UserSummary>,
}

// ============================================
// JWT Claims
// ============================================

/// JWT claims for session tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user ID)
    pub sub: i64,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// Issuer
    pub iss: String,
}

// ============================================
// Validation helpers
// ============================================

const PASSWORD_SPECIALS: &str = "!@#$%^&*";

/// 8-16 characters from letters, digits and `!@#$%^&*`, with at least one
/// digit and one special character.
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    let len = password.chars().count();
    if !(8..=16).contains(&len) {
        return Err(ValidationError::new("password_length")
            .with_message("Password must be between 8 to 16 characters long.".into()));
    }

    let allowed = password
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || PASSWORD_SPECIALS.contains(c));
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| PASSWORD_SPECIALS.contains(c));

    if !allowed || !has_digit || !has_special {
        return Err(ValidationError::new("password_strength").with_message(
            "Password must contain at least one number and one special character.".into(),
        ));
    }

    Ok(())
}

/// 3-10 alphanumeric characters
pub fn validate_nick(nick: &str) -> Result<(), ValidationError> {
    let len = nick.chars().count();
    if !(3..=10).contains(&len) || !nick.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::new("nick").with_message(
            "Nickname should be between 3 to 10 alpha numeric characters long".into(),
        ));
    }
    Ok(())
}

/// A search value must be an email address or alphanumeric
pub fn is_searchable(value: &str) -> bool {
    !value.is_empty() && (value.validate_email() || value.chars().all(|c| c.is_alphanumeric()))
}

/// Display name used in greetings, e.g. "Ada Lovelace"
pub fn display_name(first_name: &str, last_name: &str) -> String {
    format!(
        "{} {}",
        capitalize_first_letter(first_name),
        capitalize_first_letter(last_name)
    )
}

pub fn capitalize_first_letter(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
