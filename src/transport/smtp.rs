//! SMTP transport — relay sending via lettre.
//!
//! Recipients go on BCC so one transport call covers a whole chunk without
//! exposing the list.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::{ExposeSecret, SecretString};

use crate::error::TransportError;
use crate::model::Recipient;
use crate::transport::Transport;

/// SMTP relay transport.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(
        host: &str,
        port: u16,
        username: String,
        password: SecretString,
    ) -> Result<Self, TransportError> {
        let creds = Credentials::new(username, password.expose_secret().to_string());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| TransportError::NotConfigured(format!("SMTP relay error: {e}")))?
            .port(port)
            .credentials(creds)
            .build();

        Ok(Self { transport })
    }
}

#[async_trait]
impl Transport for SmtpMailer {
    async fn send(
        &self,
        from: &str,
        subject: &str,
        html: &str,
        recipients: &[Recipient],
    ) -> Result<String, TransportError> {
        let mut builder = Message::builder()
            .from(from.parse().map_err(|e| TransportError::InvalidAddress {
                address: from.to_string(),
                reason: format!("invalid from address: {e}"),
            })?)
            .subject(subject);

        for recipient in recipients {
            builder = builder.bcc(recipient.as_str().parse().map_err(|e| {
                TransportError::InvalidAddress {
                    address: recipient.to_string(),
                    reason: format!("invalid recipient: {e}"),
                }
            })?);
        }

        let email = builder
            .header(ContentType::TEXT_HTML)
            .body(html.to_string())
            .map_err(|e| TransportError::Message(e.to_string()))?;

        let response = self
            .transport
            .send(email)
            .await
            .map_err(|e| TransportError::Send(e.to_string()))?;

        Ok(response.code().to_string())
    }
}
