//! Segment directory — resolves a named segment to its member addresses.
//!
//! The directory is an external HTTP collaborator; the trait keeps the
//! resolver testable without a network.

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::SegmentsConfig;
use crate::error::ResolveError;

/// Looks up the members of a named segment for a tenant.
#[async_trait]
pub trait SegmentDirectory: Send + Sync {
    /// Raw member addresses of `(tenant_id, segment)`, in directory order.
    async fn members(&self, tenant_id: &str, segment: &str) -> Result<Vec<String>, ResolveError>;
}

/// HTTP segment directory client.
pub struct HttpSegmentDirectory {
    client: reqwest::Client,
    config: SegmentsConfig,
}

impl HttpSegmentDirectory {
    pub fn new(config: SegmentsConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

/// Directory response shape: `{"emails": ["a@x.com", ...]}`.
#[derive(Debug, Deserialize)]
struct SegmentResponse {
    emails: Vec<String>,
}

#[async_trait]
impl SegmentDirectory for HttpSegmentDirectory {
    async fn members(&self, tenant_id: &str, segment: &str) -> Result<Vec<String>, ResolveError> {
        let response = self
            .client
            .get(&self.config.base_url)
            .query(&[("id", tenant_id), ("segment", segment)])
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|e| ResolveError::SegmentUnreachable {
                segment: segment.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::SegmentUnreachable {
                segment: segment.to_string(),
                reason: format!("directory returned status {status}"),
            });
        }

        let body: SegmentResponse =
            response
                .json()
                .await
                .map_err(|e| ResolveError::MalformedSegment {
                    segment: segment.to_string(),
                    reason: e.to_string(),
                })?;

        Ok(body.emails)
    }
}
