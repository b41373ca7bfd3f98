//! Email transport boundary.
//!
//! The dispatcher only ever sees the `Mailer` trait; production wires in
//! `SmtpMailer`, tests wire in whatever failure shape they need.

use async_trait::async_trait;
use common::config::Config;
use lettre::message::{header, Message, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};

const SMTP_RELAY: &str = "smtp.gmail.com";

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("smtp failure: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), MailError>;
}

/// SMTP transport over the configured relay account.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    pub fn from_config() -> Self {
        let config = Config::get();

        let tls_parameters = TlsParameters::new(SMTP_RELAY.to_string())
            .expect("Failed to create TLS parameters");

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(SMTP_RELAY)
            .expect("Failed to create SMTP transport")
            .port(587)
            .tls(Tls::Required(tls_parameters))
            .credentials(Credentials::new(
                config.smtp_username.clone(),
                config.smtp_app_password.clone(),
            ))
            .build();

        Self {
            transport,
            from: format!("{} <{}>", config.email_from_name, config.smtp_username),
        }
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.from.parse()?)
            .to(recipient.parse()?)
            .subject(subject)
            .singlepart(
                SinglePart::builder()
                    .header(header::ContentType::TEXT_PLAIN)
                    .body(body.to_string()),
            )?;

        self.transport.send(message).await?;
        Ok(())
    }
}
