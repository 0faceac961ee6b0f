//! Session token issuing and verification
//!
//! Stateless HS256 JWTs. Validity is the signature plus the expiry; the
//! caller re-checks that the subject still exists.

use crate::config::{self, AuthConfig};
use crate::error::AuthError;
use crate::models::SessionClaims;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

/// Issues and verifies session tokens with the server secret
pub struct SessionTokens {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    lifetime: Duration,
}

impl SessionTokens {
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            issuer: config.jwt_issuer.clone(),
            lifetime: config::lifetime(config.session_token_expiration)?,
        })
    }

    /// Issue a token for a user
    pub fn issue(&self, user_id: i64) -> Result<String, AuthError> {
        self.issue_at(user_id, Utc::now())
    }

    fn issue_at(&self, user_id: i64, now: DateTime<Utc>) -> Result<String, AuthError> {
        let expires_at = now.checked_add_signed(self.lifetime).ok_or_else(|| {
            tracing::error!("Session token expiry is out of range");
            AuthError::Internal
        })?;

        let claims = SessionClaims {
            sub: user_id,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            iss: self.issuer.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to sign session token: {:?}", e);
            AuthError::Internal
        })
    }

    /// Verify a token and return its claims
    pub fn verify(&self, token: &str) -> Result<SessionClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.leeway = 0;

        let token_data = decode::<SessionClaims>(token, &self.decoding_key, &validation)?;

        Ok(token_data.claims)
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header value
pub fn bearer_token(header: &str) -> Option<&str> {
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HashCost, ResetTokenMode};

    fn config(secret: &str) -> AuthConfig {
        AuthConfig {
            jwt_secret: secret.to_string(),
            jwt_issuer: "wordcloud".to_string(),
            session_token_expiration: 86400,
            reset_token_expiration: 3600,
            password_cost: HashCost::default(),
            reset_token_cost: HashCost::default(),
            reset_token_mode: ResetTokenMode::EmailDigest,
        }
    }

    fn tokens() -> SessionTokens {
        SessionTokens::new(&config("test-secret-that-is-at-least-32-chars")).unwrap()
    }

    #[test]
    fn test_issue_then_verify() {
        let tokens = tokens();
        let token = tokens.issue(42).unwrap();
        let claims = tokens.verify(&token).unwrap();

        assert_eq!(claims.sub, 42);
        assert_eq!(claims.exp - claims.iat, 86400);
        assert_eq!(claims.iss, "wordcloud");
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let tokens = tokens();
        let token = tokens.issue(42).unwrap();

        let (head, signature) = token.rsplit_once('.').unwrap();
        let mut sig: Vec<char> = signature.chars().collect();
        sig[0] = if sig[0] == 'A' { 'B' } else { 'A' };
        let tampered = format!("{}.{}", head, sig.into_iter().collect::<String>());

        assert!(matches!(
            tokens.verify(&tampered),
            Err(AuthError::Unauthenticated)
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let tokens = tokens();
        let token = tokens
            .issue_at(42, Utc::now() - Duration::hours(25))
            .unwrap();

        assert!(matches!(tokens.verify(&token), Err(AuthError::Unauthenticated)));
    }

    #[test]
    fn test_other_secret_rejected() {
        let token = tokens().issue(42).unwrap();
        let other = SessionTokens::new(&config("another-secret-that-is-32-chars-long")).unwrap();

        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn test_malformed_token_rejected() {
        assert!(matches!(
            tokens().verify("not.a.jwt"),
            Err(AuthError::Unauthenticated)
        ));
        assert!(tokens().verify("").is_err());
    }

    #[test]
    fn test_unrepresentable_expiry_is_an_error() {
        let tokens = SessionTokens::new(&AuthConfig {
            session_token_expiration: 10_i64.pow(13),
            ..config("test-secret-that-is-at-least-32-chars")
        })
        .unwrap();

        assert!(matches!(tokens.issue(42), Err(AuthError::Internal)));
    }

    #[test]
    fn test_lifetime_beyond_duration_range_rejected() {
        let result = SessionTokens::new(&AuthConfig {
            session_token_expiration: i64::MAX,
            ..config("test-secret-that-is-at-least-32-chars")
        });

        assert!(matches!(result, Err(AuthError::Config(_))));
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Basic abc"), None);
    }
}
