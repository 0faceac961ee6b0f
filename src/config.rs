//! Authentication Configuration
//!
//! All configuration values are loaded from environment variables once at
//! startup and are read-only afterwards.

use crate::error::AuthError;
use std::env;
use std::str::FromStr;

/// Upper bound for either token lifetime: ten years
pub const MAX_TOKEN_LIFETIME_SECS: i64 = 10 * 365 * 24 * 60 * 60;

/// Argon2 cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashCost {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Time cost (iterations)
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl HashCost {
    /// Build argon2 parameters from this cost
    pub fn params(&self) -> Result<argon2::Params, AuthError> {
        argon2::Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| AuthError::Config(format!("invalid argon2 parameters: {}", e)))
    }
}

impl Default for HashCost {
    fn default() -> Self {
        Self {
            memory_kib: 19456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// How password reset tokens are minted and looked up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResetTokenMode {
    /// Salted one-way hash of the email, stored and looked up verbatim
    #[default]
    EmailDigest,
    /// Random secret handed to the user; only its SHA-256 digest is stored
    Random,
}

impl FromStr for ResetTokenMode {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email-digest" | "email_digest" => Ok(Self::EmailDigest),
            "random" => Ok(Self::Random),
            other => Err(AuthError::Config(format!(
                "RESET_TOKEN_MODE must be 'email-digest' or 'random', got '{}'",
                other
            ))),
        }
    }
}

/// Authentication configuration loaded from environment
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// JWT secret key for signing session tokens (from JWT_SECRET env var)
    pub jwt_secret: String,

    /// JWT issuer (from JWT_ISSUER env var)
    pub jwt_issuer: String,

    /// Session token lifetime in seconds (from SESSION_TOKEN_EXPIRATION env var)
    pub session_token_expiration: i64,

    /// Reset token lifetime in seconds (from RESET_TOKEN_EXPIRATION env var)
    pub reset_token_expiration: i64,

    /// Cost used when hashing account passwords
    pub password_cost: HashCost,

    /// Cost used when salting email-derived reset tokens
    pub reset_token_cost: HashCost,

    /// Reset token minting strategy (from RESET_TOKEN_MODE env var)
    pub reset_token_mode: ResetTokenMode,
}

impl AuthConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AuthError> {
        let jwt_secret = env::var("JWT_SECRET").map_err(|_| {
            AuthError::Config("JWT_SECRET environment variable must be set".to_string())
        })?;

        let defaults = HashCost::default();

        let reset_token_mode = match env::var("RESET_TOKEN_MODE") {
            Ok(v) => v.parse()?,
            Err(_) => ResetTokenMode::default(),
        };

        Ok(Self {
            jwt_secret,

            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "wordcloud".to_string()),

            session_token_expiration: env_or("SESSION_TOKEN_EXPIRATION", 86400), // 24 hours

            reset_token_expiration: env_or("RESET_TOKEN_EXPIRATION", 3600), // 1 hour

            password_cost: HashCost {
                memory_kib: env_or("ARGON2_MEMORY_COST", defaults.memory_kib),
                iterations: env_or("ARGON2_TIME_COST", defaults.iterations),
                parallelism: env_or("ARGON2_PARALLELISM", defaults.parallelism),
            },

            reset_token_cost: HashCost {
                memory_kib: env_or("RESET_ARGON2_MEMORY_COST", defaults.memory_kib),
                iterations: env_or("RESET_ARGON2_TIME_COST", 1),
                parallelism: env_or("RESET_ARGON2_PARALLELISM", defaults.parallelism),
            },

            reset_token_mode,
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.jwt_secret.len() < 32 {
            return Err(AuthError::Config(
                "JWT_SECRET must be at least 32 characters".to_string(),
            ));
        }

        check_lifetime("SESSION_TOKEN_EXPIRATION", self.session_token_expiration)?;
        check_lifetime("RESET_TOKEN_EXPIRATION", self.reset_token_expiration)?;

        self.password_cost.params()?;
        self.reset_token_cost.params()?;

        Ok(())
    }
}

/// Outbound mail configuration
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    /// Sender address, also the SMTP username (from EMAIL_ID env var)
    pub sender: String,
    pub password: String,
    pub from_name: String,
    /// Public base URL used to build reset links (from DOMAIN env var)
    pub public_url: String,
    pub send_welcome: bool,
    pub send_password_reset: bool,
}

impl MailConfig {
    /// Load mail configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            smtp_host: env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".to_string()),
            smtp_port: env_or("SMTP_PORT", 465),
            sender: env::var("EMAIL_ID").unwrap_or_default(),
            password: env::var("MAIL_PASSWORD").unwrap_or_default(),
            from_name: env::var("MAIL_FROM_NAME").unwrap_or_else(|_| "Word Cloud".to_string()),
            public_url: env::var("DOMAIN").unwrap_or_else(|_| "http://localhost:3000".to_string()),
            send_welcome: env_flag("FLAG_SEND_WELCOME_EMAIL"),
            send_password_reset: env_flag("FLAG_SEND_PASSWORD_RESET_EMAIL"),
        }
    }
}

/// Server process configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub port: u16,
    pub max_connections: u32,
}

impl ServerConfig {
    /// Load server configuration from environment variables
    pub fn from_env() -> Result<Self, AuthError> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").map_err(|_| {
                AuthError::Config("DATABASE_URL environment variable must be set".to_string())
            })?,
            port: env_or("PORT", 3000),
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", 5),
        })
    }
}

fn check_lifetime(key: &str, secs: i64) -> Result<(), AuthError> {
    if secs <= 0 {
        return Err(AuthError::Config(format!("{} must be positive", key)));
    }
    if secs > MAX_TOKEN_LIFETIME_SECS {
        return Err(AuthError::Config(format!(
            "{} must be at most {} seconds",
            key, MAX_TOKEN_LIFETIME_SECS
        )));
    }
    Ok(())
}

/// Lifetime in seconds as a duration, rejecting values chrono cannot hold
pub(crate) fn lifetime(secs: i64) -> Result<chrono::Duration, AuthError> {
    chrono::Duration::try_seconds(secs)
        .ok_or_else(|| AuthError::Config(format!("lifetime of {} seconds is out of range", secs)))
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// Only the literal "true" turns a flag on.
fn env_flag(key: &str) -> bool {
    env::var(key).map(|v| v == "true").unwrap_or(false)
}
