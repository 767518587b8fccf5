//! Recipient resolution — turns a campaign's addressing mode into a
//! concrete ordered set of unique, validated addresses.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::warn;

use crate::error::ResolveError;
use crate::model::{Addressing, Campaign, Recipient};
use crate::segments::SegmentDirectory;

/// Resolves a campaign's recipient set. Pure transform plus at most one
/// external read (the segment directory).
pub struct RecipientResolver {
    segments: Arc<dyn SegmentDirectory>,
}

impl RecipientResolver {
    pub fn new(segments: Arc<dyn SegmentDirectory>) -> Self {
        Self { segments }
    }

    /// Resolve to an ordered, de-duplicated recipient set.
    ///
    /// Invalid addresses are dropped with a warning rather than aborting
    /// the run — one bad recipient must not sink the campaign.
    pub async fn resolve(&self, campaign: &Campaign) -> Result<Vec<Recipient>, ResolveError> {
        let raw = match &campaign.addressing {
            Addressing::ExplicitList { recipients } => recipients.clone(),
            Addressing::Segment { name } => {
                if name.trim().is_empty() {
                    return Err(ResolveError::NoRecipientSource);
                }
                self.segments.members(&campaign.tenant_id, name).await?
            }
        };

        Ok(dedupe_validated(&campaign.tenant_id, raw))
    }
}

/// Validate and de-duplicate while preserving first-seen order.
fn dedupe_validated(tenant_id: &str, raw: Vec<String>) -> Vec<Recipient> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(raw.len());
    for address in raw {
        match Recipient::parse(&address) {
            Ok(recipient) => {
                if seen.insert(recipient.clone()) {
                    out.push(recipient);
                }
            }
            Err(reason) => {
                warn!(tenant = %tenant_id, address = %address, %reason, "Dropping invalid address");
            }
        }
    }
    out
}
