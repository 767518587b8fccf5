//! Consent filtering — partitions a recipient set into consented and
//! blocked using the external consent registry.
//!
//! The filter never retries and never silently passes recipients through:
//! missing or inactive tenant consent configuration is an error, and the
//! only bypass is the tenant's explicit `consent_check_enabled = false`
//! flag, which is logged every time it is taken.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::RegistryConfig;
use crate::error::ConsentError;
use crate::model::{Recipient, TenantConfig};

/// Result of one consent check: two disjoint sets whose union is the input.
#[derive(Debug, Clone, Default)]
pub struct Partition {
    pub consented: Vec<Recipient>,
    pub blocked: Vec<Recipient>,
}

/// External consent registry — answers multi-recipient status queries.
#[async_trait]
pub trait ConsentRegistry: Send + Sync {
    /// The subset of `recipients` with an opt-in on file for the given
    /// program/brand registration.
    async fn consented_subset(
        &self,
        program_code: i64,
        brand_code: i64,
        recipients: &[Recipient],
    ) -> Result<Vec<Recipient>, ConsentError>;
}

/// Partitions recipients by registry verdict, per tenant configuration.
pub struct ConsentFilter {
    registry: Arc<dyn ConsentRegistry>,
}

impl ConsentFilter {
    pub fn new(registry: Arc<dyn ConsentRegistry>) -> Self {
        Self { registry }
    }

    /// One registry call per dispatch run, with the full batch.
    ///
    /// The partition reproduces the registry's verdict exactly and
    /// preserves the input order within each side.
    pub async fn filter(
        &self,
        tenant: &TenantConfig,
        recipients: &[Recipient],
    ) -> Result<Partition, ConsentError> {
        if !tenant.consent.check_enabled {
            info!(
                tenant = %tenant.tenant_id,
                count = recipients.len(),
                "Consent check disabled by tenant configuration — treating all recipients as consented"
            );
            return Ok(Partition {
                consented: recipients.to_vec(),
                blocked: Vec::new(),
            });
        }

        if !tenant.consent.active {
            return Err(ConsentError::ConfigUnavailable {
                tenant: tenant.tenant_id.clone(),
            });
        }

        if recipients.is_empty() {
            return Ok(Partition::default());
        }

        let consented = self
            .registry
            .consented_subset(
                tenant.consent.program_code,
                tenant.consent.brand_code,
                recipients,
            )
            .await?;

        let consented_set: HashSet<&str> = consented.iter().map(Recipient::as_str).collect();

        let mut partition = Partition::default();
        for recipient in recipients {
            if consented_set.contains(recipient.as_str()) {
                partition.consented.push(recipient.clone());
            } else {
                partition.blocked.push(recipient.clone());
            }
        }

        debug!(
            tenant = %tenant.tenant_id,
            consented = partition.consented.len(),
            blocked = partition.blocked.len(),
            "Consent check complete"
        );
        Ok(partition)
    }
}

// ── HTTP registry client ────────────────────────────────────────────

/// HTTP consent registry client (multi-recipient status endpoint).
pub struct HttpConsentRegistry {
    client: reqwest::Client,
    config: RegistryConfig,
}

impl HttpConsentRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

/// Multi-status request body.
#[derive(Debug, Serialize)]
struct StatusRequest<'a> {
    recipients: Vec<&'a str>,
    #[serde(rename = "recipientType")]
    recipient_type: &'static str,
    #[serde(rename = "type")]
    message_type: &'static str,
    #[serde(rename = "iysCode")]
    program_code: i64,
    #[serde(rename = "brandCode")]
    brand_code: i64,
}

/// Registry response: `{"data": {"list": ["a@x.com", ...]}}`.
#[derive(Debug, Deserialize)]
struct StatusResponse {
    data: StatusData,
}

#[derive(Debug, Deserialize)]
struct StatusData {
    list: Vec<String>,
}

#[async_trait]
impl ConsentRegistry for HttpConsentRegistry {
    async fn consented_subset(
        &self,
        program_code: i64,
        brand_code: i64,
        recipients: &[Recipient],
    ) -> Result<Vec<Recipient>, ConsentError> {
        let body = StatusRequest {
            recipients: recipients.iter().map(Recipient::as_str).collect(),
            recipient_type: "BIREYSEL",
            message_type: "EPOSTA",
            program_code,
            brand_code,
        };

        let response = self
            .client
            .post(format!("{}/consent/multiple/status", self.config.base_url))
            .header("IYS-API-KEY", self.config.api_key.expose_secret())
            .timeout(self.config.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| ConsentError::CheckFailed {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConsentError::CheckFailed {
                reason: format!("registry returned status {status}"),
            });
        }

        let parsed: StatusResponse =
            response.json().await.map_err(|e| ConsentError::CheckFailed {
                reason: format!("malformed registry response: {e}"),
            })?;

        // Addresses the registry echoes back that we never asked about are
        // ignored; the partition is driven by the input set.
        Ok(parsed
            .data
            .list
            .iter()
            .filter_map(|a| Recipient::parse(a).ok())
            .collect())
    }
}
