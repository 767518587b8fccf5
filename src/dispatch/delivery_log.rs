//! Delivery log — append-only per-recipient outcome records, written in
//! bounded batches.
//!
//! There is no multi-batch transaction: a batch that fails is reported,
//! batches already written stay. Entry ids are generated fresh per run, so
//! re-running a failed campaign adds rows next to the prior attempt's
//! instead of overwriting them.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::model::DeliveryLogEntry;
use crate::store::Store;

/// What an append pass actually did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppendOutcome {
    /// Entries persisted.
    pub written: usize,
    /// Batches that failed to write (their entries are lost to this run).
    pub failed_batches: usize,
}

impl AppendOutcome {
    pub fn fully_written(&self) -> bool {
        self.failed_batches == 0
    }
}

/// Batched writer for delivery-log entries.
pub struct DeliveryLog {
    store: Arc<dyn Store>,
    batch_size: usize,
}

impl DeliveryLog {
    pub fn new(store: Arc<dyn Store>, batch_size: usize) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
        }
    }

    /// Append `entries` in batches. An empty input performs no writes.
    pub async fn append(&self, entries: &[DeliveryLogEntry]) -> AppendOutcome {
        let mut outcome = AppendOutcome::default();
        if entries.is_empty() {
            return outcome;
        }

        for (index, batch) in entries.chunks(self.batch_size).enumerate() {
            match self.store.insert_log_entries(batch).await {
                Ok(()) => outcome.written += batch.len(),
                Err(e) => {
                    warn!(batch = index, size = batch.len(), error = %e, "Delivery log batch write failed");
                    outcome.failed_batches += 1;
                }
            }
        }

        debug!(
            written = outcome.written,
            failed_batches = outcome.failed_batches,
            "Delivery log append complete"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::Mutex;
    use uuid::Uuid;

    use crate::error::DatabaseError;
    use crate::model::{
        Affirmation, Campaign, CampaignStatus, MessageType, QuotaAccount, Recipient, TenantConfig,
        TrackedLink,
    };
    use crate::store::LibSqlStore;

    fn entries(n: usize) -> Vec<DeliveryLogEntry> {
        let campaign_id = Uuid::new_v4();
        (0..n)
            .map(|i| {
                DeliveryLogEntry::new(
                    campaign_id,
                    "t1",
                    Recipient::parse(&format!("user{i}@x.com")).unwrap(),
                    Affirmation::Delivered,
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn empty_input_performs_no_writes() {
        let store = Arc::new(LibSqlStore::new_memory().await.unwrap());
        let log = DeliveryLog::new(store, 25);

        let outcome = log.append(&[]).await;
        assert_eq!(outcome, AppendOutcome::default());
        assert!(outcome.fully_written());
    }

    #[tokio::test]
    async fn entries_are_split_into_batches() {
        let store = Arc::new(LibSqlStore::new_memory().await.unwrap());
        let log = DeliveryLog::new(Arc::clone(&store) as Arc<dyn Store>, 25);

        let input = entries(60);
        let outcome = log.append(&input).await;
        assert_eq!(outcome.written, 60);
        assert!(outcome.fully_written());

        let stored = store.list_log_entries(input[0].campaign_id).await.unwrap();
        assert_eq!(stored.len(), 60);
    }

    /// Store wrapper that fails a chosen batch write.
    struct FailNthBatch {
        inner: Arc<dyn Store>,
        fail_on: usize,
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl Store for FailNthBatch {
        async fn init_schema(&self) -> Result<(), DatabaseError> {
            self.inner.init_schema().await
        }
        async fn insert_campaign(&self, c: &Campaign) -> Result<(), DatabaseError> {
            self.inner.insert_campaign(c).await
        }
        async fn get_campaign(&self, id: Uuid) -> Result<Option<Campaign>, DatabaseError> {
            self.inner.get_campaign(id).await
        }
        async fn list_campaigns(
            &self,
            tenant_id: &str,
            limit: usize,
        ) -> Result<Vec<Campaign>, DatabaseError> {
            self.inner.list_campaigns(tenant_id, limit).await
        }
        async fn update_campaign_outcome(
            &self,
            id: Uuid,
            status: CampaignStatus,
            total_recipients: u32,
            total_delivered: u32,
        ) -> Result<(), DatabaseError> {
            self.inner
                .update_campaign_outcome(id, status, total_recipients, total_delivered)
                .await
        }
        async fn list_due_campaigns(
            &self,
            due_before: DateTime<Utc>,
        ) -> Result<Vec<Campaign>, DatabaseError> {
            self.inner.list_due_campaigns(due_before).await
        }
        async fn upsert_tenant(&self, t: &TenantConfig) -> Result<(), DatabaseError> {
            self.inner.upsert_tenant(t).await
        }
        async fn get_tenant(&self, tenant_id: &str) -> Result<Option<TenantConfig>, DatabaseError> {
            self.inner.get_tenant(tenant_id).await
        }
        async fn get_quota(
            &self,
            tenant_id: &str,
            message_type: MessageType,
        ) -> Result<Option<QuotaAccount>, DatabaseError> {
            self.inner.get_quota(tenant_id, message_type).await
        }
        async fn upsert_quota(&self, a: &QuotaAccount) -> Result<(), DatabaseError> {
            self.inner.upsert_quota(a).await
        }
        async fn debit_quota(
            &self,
            tenant_id: &str,
            message_type: MessageType,
            amount: u32,
        ) -> Result<QuotaAccount, DatabaseError> {
            self.inner.debit_quota(tenant_id, message_type, amount).await
        }
        async fn insert_log_entries(
            &self,
            entries: &[DeliveryLogEntry],
        ) -> Result<(), DatabaseError> {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                let current = *calls;
                *calls += 1;
                current
            };
            if call == self.fail_on {
                return Err(DatabaseError::Query("simulated batch failure".into()));
            }
            self.inner.insert_log_entries(entries).await
        }
        async fn list_log_entries(
            &self,
            campaign_id: Uuid,
        ) -> Result<Vec<DeliveryLogEntry>, DatabaseError> {
            self.inner.list_log_entries(campaign_id).await
        }
        async fn mark_opened(&self, entry_id: Uuid) -> Result<bool, DatabaseError> {
            self.inner.mark_opened(entry_id).await
        }
        async fn insert_links(&self, links: &[TrackedLink]) -> Result<(), DatabaseError> {
            self.inner.insert_links(links).await
        }
        async fn get_link(&self, id: Uuid) -> Result<Option<TrackedLink>, DatabaseError> {
            self.inner.get_link(id).await
        }
        async fn list_links(&self, campaign_id: Uuid) -> Result<Vec<TrackedLink>, DatabaseError> {
            self.inner.list_links(campaign_id).await
        }
        async fn record_click(&self, id: Uuid) -> Result<Option<TrackedLink>, DatabaseError> {
            self.inner.record_click(id).await
        }
    }

    #[tokio::test]
    async fn failed_batch_does_not_undo_written_ones() {
        let inner: Arc<dyn Store> = Arc::new(LibSqlStore::new_memory().await.unwrap());
        let failing = Arc::new(FailNthBatch {
            inner: Arc::clone(&inner),
            fail_on: 1, // second batch
            calls: Mutex::new(0),
        });
        let log = DeliveryLog::new(failing, 25);

        let input = entries(60);
        let outcome = log.append(&input).await;

        // Batches 0 and 2 written (25 + 10), batch 1 lost.
        assert_eq!(outcome.written, 35);
        assert_eq!(outcome.failed_batches, 1);
        assert!(!outcome.fully_written());

        let stored = inner.list_log_entries(input[0].campaign_id).await.unwrap();
        assert_eq!(stored.len(), 35);
    }
}
