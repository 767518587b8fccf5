//! Unified `Store` trait — single async interface for all persistence.
//!
//! Campaigns, tenant configuration, quota accounts, the delivery log and
//! tracked links all live behind this trait so the pipeline can run against
//! the libSQL backend in production and an in-memory database in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::model::{
    Campaign, CampaignStatus, DeliveryLogEntry, MessageType, QuotaAccount, TenantConfig,
    TrackedLink,
};

/// Backend-agnostic store covering campaigns, tenants, quota, logs and links.
#[async_trait]
pub trait Store: Send + Sync {
    /// Run all pending schema migrations.
    async fn init_schema(&self) -> Result<(), DatabaseError>;

    // ── Campaigns ───────────────────────────────────────────────────

    /// Insert a new campaign.
    async fn insert_campaign(&self, campaign: &Campaign) -> Result<(), DatabaseError>;

    /// Get a campaign by id.
    async fn get_campaign(&self, id: Uuid) -> Result<Option<Campaign>, DatabaseError>;

    /// List a tenant's campaigns, most recent first, up to `limit`.
    async fn list_campaigns(
        &self,
        tenant_id: &str,
        limit: usize,
    ) -> Result<Vec<Campaign>, DatabaseError>;

    /// Write back a finished run's outcome: status, recipient totals, and
    /// clear the scheduled flag (a dispatch consumes the schedule).
    async fn update_campaign_outcome(
        &self,
        id: Uuid,
        status: CampaignStatus,
        total_recipients: u32,
        total_delivered: u32,
    ) -> Result<(), DatabaseError>;

    /// Scheduled campaigns whose `scheduled_at` falls at or before `due_before`.
    async fn list_due_campaigns(
        &self,
        due_before: DateTime<Utc>,
    ) -> Result<Vec<Campaign>, DatabaseError>;

    // ── Tenants ─────────────────────────────────────────────────────

    /// Insert or replace a tenant's configuration.
    async fn upsert_tenant(&self, tenant: &TenantConfig) -> Result<(), DatabaseError>;

    /// Get a tenant's configuration.
    async fn get_tenant(&self, tenant_id: &str) -> Result<Option<TenantConfig>, DatabaseError>;

    // ── Quota accounts ──────────────────────────────────────────────

    /// Read a tenant's quota account for one message type.
    async fn get_quota(
        &self,
        tenant_id: &str,
        message_type: MessageType,
    ) -> Result<Option<QuotaAccount>, DatabaseError>;

    /// Insert or replace a quota account (admin/seed path).
    async fn upsert_quota(&self, account: &QuotaAccount) -> Result<(), DatabaseError>;

    /// Debit a quota account by `amount` as one conditional increment
    /// (`used = used + amount`, saturating at the limit) — never a blind
    /// overwrite, so concurrent runs for the same tenant converge to a
    /// correct total even when their reads raced. Returns the account as it
    /// stands after the debit.
    async fn debit_quota(
        &self,
        tenant_id: &str,
        message_type: MessageType,
        amount: u32,
    ) -> Result<QuotaAccount, DatabaseError>;

    // ── Delivery log ────────────────────────────────────────────────

    /// Append one batch of delivery-log entries. Callers are expected to
    /// pre-chunk; this writes exactly what it is given.
    async fn insert_log_entries(&self, entries: &[DeliveryLogEntry]) -> Result<(), DatabaseError>;

    /// All log entries for a campaign, oldest first.
    async fn list_log_entries(
        &self,
        campaign_id: Uuid,
    ) -> Result<Vec<DeliveryLogEntry>, DatabaseError>;

    /// Transition a delivered entry to `opened`. Idempotent — returns
    /// `true` only when this call performed the transition.
    async fn mark_opened(&self, entry_id: Uuid) -> Result<bool, DatabaseError>;

    // ── Tracked links ───────────────────────────────────────────────

    /// Persist the tracked links produced by a rewrite pass.
    async fn insert_links(&self, links: &[TrackedLink]) -> Result<(), DatabaseError>;

    /// Get a tracked link by id.
    async fn get_link(&self, id: Uuid) -> Result<Option<TrackedLink>, DatabaseError>;

    /// All tracked links for a campaign, oldest first.
    async fn list_links(&self, campaign_id: Uuid) -> Result<Vec<TrackedLink>, DatabaseError>;

    /// Increment a link's click count and return the updated link, or
    /// `None` if the id is unknown.
    async fn record_click(&self, id: Uuid) -> Result<Option<TrackedLink>, DatabaseError>;
}
