//! Outbound mail transports — a generic "send a message to N recipients"
//! capability, selected per tenant at configuration time.

pub mod http_api;
pub mod smtp;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::model::{Recipient, TransportKind};

pub use http_api::HttpApiMailer;
pub use smtp::SmtpMailer;

/// Generic send capability. Implementations are provider-specific; the
/// dispatcher is transport-agnostic beyond this contract.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one message to every recipient in `recipients`. Returns a
    /// provider delivery-receipt identifier.
    async fn send(
        &self,
        from: &str,
        subject: &str,
        html: &str,
        recipients: &[Recipient],
    ) -> Result<String, TransportError>;
}

/// Builds the transport a tenant is configured to send through.
pub trait TransportFactory: Send + Sync {
    fn create(&self, kind: &TransportKind) -> Result<Arc<dyn Transport>, TransportError>;
}

/// Default factory: SMTP relay via lettre, HTTP providers via reqwest.
pub struct TenantTransportFactory;

impl TransportFactory for TenantTransportFactory {
    fn create(&self, kind: &TransportKind) -> Result<Arc<dyn Transport>, TransportError> {
        match kind {
            TransportKind::Smtp {
                host,
                port,
                username,
                password,
            } => Ok(Arc::new(SmtpMailer::new(
                host,
                *port,
                username.clone(),
                password.clone(),
            )?)),
            TransportKind::HttpApi { endpoint, api_key } => Ok(Arc::new(HttpApiMailer::new(
                endpoint.clone(),
                api_key.clone(),
            ))),
        }
    }
}
