//! Word Cloud Authentication
//!
//! Credential and identity layer for Word Cloud providing:
//! - User registration and login
//! - Stateless JWT session tokens
//! - Argon2id password hashing
//! - Single-use, time-limited password reset tokens
//! - Bearer-token middleware for protected routes
//!
//! # Configuration
//!
//! All configuration is loaded from environment variables:
//! - `JWT_SECRET` - Secret key for signing JWTs (required, min 32 chars)
//! - `JWT_ISSUER` - JWT issuer claim (default: "wordcloud")
//! - `SESSION_TOKEN_EXPIRATION` - Session token lifetime in seconds (default: 86400)
//! - `RESET_TOKEN_EXPIRATION` - Reset token lifetime in seconds (default: 3600)
//! - `ARGON2_*` / `RESET_ARGON2_*` - Hashing cost for passwords and reset tokens
//! - `RESET_TOKEN_MODE` - `email-digest` (default) or `random`
//! - `FLAG_SEND_WELCOME_EMAIL` / `FLAG_SEND_PASSWORD_RESET_EMAIL` - Mail dispatch switches
//! - `DATABASE_URL` - PostgreSQL connection string (required by the server)
//!
//! # Usage
//!
//! ```rust,ignore
//! use wordcloud_auth::{AuthConfig, AuthService, MemoryStore, SmtpMailer, MailConfig};
//!
//! let service = AuthService::new(
//!     AuthConfig::from_env()?,
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(SmtpMailer::new(MailConfig::from_env())?),
//! )?;
//! let app = wordcloud_auth::create_routes(Arc::new(service));
//! ```

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod mailer;
pub mod middleware;
pub mod models;
pub mod password;
pub mod reset;
pub mod service;
pub mod store;
pub mod token;

// Re-export commonly used types
pub use config::{AuthConfig, HashCost, MailConfig, ResetTokenMode, ServerConfig};
pub use error::AuthError;
pub use extractors::AuthUser;
pub use handlers::{create_routes, AuthState};
pub use mailer::{Mailer, SmtpMailer};
pub use models::*;
pub use password::CredentialHasher;
pub use reset::ResetTokenManager;
pub use service::AuthService;
pub use store::{MemoryStore, PgStore, Store, StoreError, UniqueField};
pub use token::SessionTokens;
