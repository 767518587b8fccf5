//! HTTP transport — transactional providers with a JSON send endpoint.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::model::Recipient;
use crate::transport::Transport;

/// JSON HTTP provider transport.
pub struct HttpApiMailer {
    client: reqwest::Client,
    endpoint: String,
    api_key: SecretString,
}

impl HttpApiMailer {
    pub fn new(endpoint: String, api_key: SecretString) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
        }
    }
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    subject: &'a str,
    html: &'a str,
    recipients: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    message_id: Option<String>,
}

#[async_trait]
impl Transport for HttpApiMailer {
    async fn send(
        &self,
        from: &str,
        subject: &str,
        html: &str,
        recipients: &[Recipient],
    ) -> Result<String, TransportError> {
        let body = SendRequest {
            from,
            subject,
            html,
            recipients: recipients.iter().map(Recipient::as_str).collect(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::Send(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        // Receipt id: x-message-id header first (common provider
        // convention), then the JSON body, then a generic marker.
        if let Some(id) = response
            .headers()
            .get("x-message-id")
            .and_then(|v| v.to_str().ok())
        {
            return Ok(id.to_string());
        }

        let parsed: SendResponse = response.json().await.unwrap_or(SendResponse {
            message_id: None,
        });
        Ok(parsed.message_id.unwrap_or_else(|| "accepted".to_string()))
    }
}
