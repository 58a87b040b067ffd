//! Outbound mail over SMTP.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::info;

use crate::config::SmtpConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid address: {0}")]
    Address(String),

    #[error("Failed to build email: {0}")]
    Build(String),

    #[error("SMTP error: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}

#[derive(Clone)]
pub struct SmtpMailer {
    config: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    fn build_transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailError> {
        let builder = if self.config.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.host)
        }
        .map_err(|e| MailError::Transport(format!("SMTP relay error: {e}")))?;

        Ok(builder
            .port(self.config.port)
            .credentials(Credentials::new(self.config.email.clone(), self.config.password.clone()))
            .build())
    }

    fn from_header(&self) -> String {
        format!("{} <{}>", self.config.from_name, self.config.from_email)
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        let email = Message::builder()
            .from(
                self.from_header()
                    .parse()
                    .map_err(|e| MailError::Address(format!("from: {e}")))?,
            )
            .to(message
                .to
                .parse()
                .map_err(|e| MailError::Address(format!("to: {e}")))?)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(message.text.clone())
            .map_err(|e| MailError::Build(e.to_string()))?;

        let response = self
            .build_transport()?
            .send(email)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        info!("Message sent: {}", response.code());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SmtpConfig {
        SmtpConfig {
            host: "localhost".into(),
            port: 2525,
            email: "user".into(),
            password: "pass".into(),
            from_name: "DevCamper".into(),
            from_email: "noreply@devcamper.io".into(),
        }
    }

    #[test]
    fn from_header_combines_name_and_address() {
        assert_eq!(SmtpMailer::new(config()).from_header(), "DevCamper <noreply@devcamper.io>");
    }

    #[tokio::test]
    async fn invalid_recipient_fails_before_connecting() {
        let mailer = SmtpMailer::new(config());
        let message = EmailMessage { to: "not an address".into(), subject: "s".into(), text: "t".into() };
        assert!(matches!(mailer.send(&message).await, Err(MailError::Address(_))));
    }
}
