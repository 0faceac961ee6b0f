//! Outbound mail
//!
//! Flows call the [`Mailer`] on a spawned task; a failed send is logged and
//! never reaches the HTTP response.

use crate::config::MailConfig;
use crate::error::AuthError;

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;

/// Mail sending interface
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Welcome mail after registration
    async fn send_welcome(&self, email: &str, name: &str) -> Result<(), AuthError>;

    /// Mail carrying a password reset link
    async fn send_password_reset(&self, email: &str, token: &str) -> Result<(), AuthError>;
}

/// Send in the background, logging failures
pub fn dispatch<F, Fut>(mailer: Arc<dyn Mailer>, kind: &'static str, send: F)
where
    F: FnOnce(Arc<dyn Mailer>) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = Result<(), AuthError>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = send(mailer).await {
            tracing::error!(kind, error = %e, "Failed to send mail");
        }
    });
}

/// Reset link pointing at the public reset endpoint
pub fn reset_link(public_url: &str, token: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(token.as_bytes()).collect();
    format!(
        "{}/api/v1/auth/reset-password?token={}",
        public_url.trim_end_matches('/'),
        encoded
    )
}

/// SMTP mailer with per-kind dispatch flags
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    config: MailConfig,
}

impl SmtpMailer {
    pub fn new(config: MailConfig) -> Result<Self, AuthError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .map_err(|e| AuthError::Config(format!("invalid SMTP host: {}", e)))?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.sender.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self { transport, config })
    }

    fn from_mailbox(&self) -> Result<Mailbox, AuthError> {
        format!("{} <{}>", self.config.from_name, self.config.sender)
            .parse()
            .map_err(|e| AuthError::Mail(format!("invalid sender address: {}", e)))
    }

    async fn send(&self, to: &str, subject: &str, body: String) -> Result<(), AuthError> {
        let to: Mailbox = to
            .parse()
            .map_err(|e| AuthError::Mail(format!("invalid recipient address: {}", e)))?;

        let message = Message::builder()
            .from(self.from_mailbox()?)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| AuthError::Mail(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AuthError::Mail(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_welcome(&self, email: &str, name: &str) -> Result<(), AuthError> {
        if !self.config.send_welcome {
            tracing::debug!(email = %email, "Welcome mail disabled, skipping");
            return Ok(());
        }

        let subject = format!("Welcome to {}", self.config.from_name);
        let body = format!(
            "Hi {},\n\nThanks for joining {}. Your account is ready to use.\n",
            name, self.config.from_name
        );
        self.send(email, &subject, body).await?;

        tracing::info!(email = %email, "Welcome mail sent");
        Ok(())
    }

    async fn send_password_reset(&self, email: &str, token: &str) -> Result<(), AuthError> {
        if !self.config.send_password_reset {
            tracing::debug!(email = %email, "Password reset mail disabled, skipping");
            return Ok(());
        }

        let subject = format!("Reset Your {} Password", self.config.from_name);
        let body = format!(
            "We received a request to reset your password.\n\n\
             Open this link within the next hour to continue:\n{}\n\n\
             If you did not ask for this, you can ignore this mail.\n",
            reset_link(&self.config.public_url, token)
        );
        self.send(email, &subject, body).await?;

        tracing::info!(email = %email, "Password reset mail sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MailConfig {
        MailConfig {
            smtp_host: "smtp.example.com".into(),
            smtp_port: 465,
            sender: "noreply@example.com".into(),
            password: "secret".into(),
            from_name: "Word Cloud".into(),
            public_url: "https://wordcloud.example.com/".into(),
            send_welcome: false,
            send_password_reset: false,
        }
    }

    #[test]
    fn test_reset_link_encodes_token() {
        let link = reset_link("https://wordcloud.example.com/", "$argon2id$v=19$a+b/c");
        assert_eq!(
            link,
            "https://wordcloud.example.com/api/v1/auth/reset-password?token=%24argon2id%24v%3D19%24a%2Bb%2Fc"
        );
    }

    #[tokio::test]
    async fn test_disabled_flags_skip_sending() {
        let mailer = SmtpMailer::new(config()).unwrap();

        assert!(mailer.send_welcome("a@b.com", "Ada Lovelace").await.is_ok());
        assert!(mailer.send_password_reset("a@b.com", "token").await.is_ok());
    }

    #[test]
    fn test_from_mailbox() {
        let mailer = SmtpMailer::new(config()).unwrap();
        let from = mailer.from_mailbox().unwrap();
        assert_eq!(from.email.to_string(), "noreply@example.com");
    }
}
