//! libSQL backend — async `Store` trait implementation.
//!
//! Supports local file and in-memory databases. The in-memory constructor
//! backs the test suites.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use secrecy::{ExposeSecret, SecretString};
use tracing::info;
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::model::{
    Addressing, Affirmation, Campaign, CampaignStatus, ConsentSettings, DeliveryLogEntry,
    MessageType, QuotaAccount, Recipient, TenantConfig, TrackedLink, TransportKind,
};
use crate::store::migrations;
use crate::store::traits::Store;

/// libSQL store backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Connection(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Connection(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Connection(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.init_schema().await?;
        info!(path = %path.display(), "Database opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Connection(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Connection(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.init_schema().await?;
        Ok(store)
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

fn parse_optional_datetime(s: &Option<String>) -> Option<DateTime<Utc>> {
    s.as_ref().map(|s| parse_datetime(s))
}

fn parse_uuid(s: &str) -> Uuid {
    Uuid::parse_str(s).unwrap_or_else(|_| Uuid::nil())
}

/// Convert `Option<&str>` to a libsql Value.
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

/// Map a libsql Row to a Campaign.
///
/// Column order matches CAMPAIGN_COLUMNS:
/// 0:id, 1:tenant_id, 2:subject, 3:body_markup, 4:addressing_mode,
/// 5:explicit_recipients, 6:segment_name, 7:from_address, 8:scheduled_at,
/// 9:is_scheduled, 10:status, 11:total_recipients, 12:total_delivered,
/// 13:created_by, 14:updated_by, 15:created_at, 16:updated_at
fn row_to_campaign(row: &libsql::Row) -> Result<Campaign, DatabaseError> {
    let id_str: String = row.get(0).map_err(db_err)?;
    let mode: String = row.get(4).map_err(db_err)?;
    let recipients_json: Option<String> = row.get(5).ok();
    let segment_name: Option<String> = row.get(6).ok();
    let scheduled_str: Option<String> = row.get(8).ok();
    let is_scheduled: i64 = row.get(9).map_err(db_err)?;
    let status_str: String = row.get(10).map_err(db_err)?;
    let total_recipients: i64 = row.get(11).map_err(db_err)?;
    let total_delivered: i64 = row.get(12).map_err(db_err)?;
    let created_str: String = row.get(15).map_err(db_err)?;
    let updated_str: String = row.get(16).map_err(db_err)?;

    let addressing = match mode.as_str() {
        "segment" => Addressing::Segment {
            name: segment_name.unwrap_or_default(),
        },
        _ => {
            let recipients: Vec<String> = recipients_json
                .as_deref()
                .and_then(|j| serde_json::from_str(j).ok())
                .unwrap_or_default();
            Addressing::ExplicitList { recipients }
        }
    };

    Ok(Campaign {
        id: parse_uuid(&id_str),
        tenant_id: row.get(1).map_err(db_err)?,
        subject: row.get(2).map_err(db_err)?,
        body_markup: row.get(3).map_err(db_err)?,
        addressing,
        from_address: row.get(7).ok(),
        scheduled_at: parse_optional_datetime(&scheduled_str),
        is_scheduled: is_scheduled != 0,
        status: status_str.parse().unwrap_or(CampaignStatus::Draft),
        total_recipients: total_recipients as u32,
        total_delivered: total_delivered as u32,
        created_by: row.get(13).ok(),
        updated_by: row.get(14).ok(),
        created_at: parse_datetime(&created_str),
        updated_at: parse_datetime(&updated_str),
    })
}

/// Map a libsql Row to a TenantConfig.
///
/// Column order matches TENANT_COLUMNS:
/// 0:tenant_id, 1:from_address, 2:consent_active, 3:consent_check_enabled,
/// 4:program_code, 5:brand_code, 6:transport_kind, 7:smtp_host, 8:smtp_port,
/// 9:smtp_username, 10:smtp_password, 11:api_endpoint, 12:api_key,
/// 13:created_at, 14:updated_at
fn row_to_tenant(row: &libsql::Row) -> Result<TenantConfig, DatabaseError> {
    let consent_active: i64 = row.get(2).map_err(db_err)?;
    let check_enabled: i64 = row.get(3).map_err(db_err)?;
    let kind: String = row.get(6).map_err(db_err)?;
    let created_str: String = row.get(13).map_err(db_err)?;
    let updated_str: String = row.get(14).map_err(db_err)?;

    let transport = match kind.as_str() {
        "http_api" => TransportKind::HttpApi {
            endpoint: row.get::<String>(11).unwrap_or_default(),
            api_key: SecretString::from(row.get::<String>(12).unwrap_or_default()),
        },
        _ => TransportKind::Smtp {
            host: row.get::<String>(7).unwrap_or_default(),
            port: row.get::<i64>(8).unwrap_or(587) as u16,
            username: row.get::<String>(9).unwrap_or_default(),
            password: SecretString::from(row.get::<String>(10).unwrap_or_default()),
        },
    };

    Ok(TenantConfig {
        tenant_id: row.get(0).map_err(db_err)?,
        from_address: row.get(1).map_err(db_err)?,
        consent: ConsentSettings {
            active: consent_active != 0,
            check_enabled: check_enabled != 0,
            program_code: row.get(4).map_err(db_err)?,
            brand_code: row.get(5).map_err(db_err)?,
        },
        transport,
        created_at: parse_datetime(&created_str),
        updated_at: parse_datetime(&updated_str),
    })
}

/// Map a libsql Row to a DeliveryLogEntry.
fn row_to_log_entry(row: &libsql::Row) -> Result<DeliveryLogEntry, DatabaseError> {
    let id_str: String = row.get(0).map_err(db_err)?;
    let campaign_str: String = row.get(1).map_err(db_err)?;
    let recipient_str: String = row.get(3).map_err(db_err)?;
    let affirmation_str: String = row.get(4).map_err(db_err)?;
    let created_str: String = row.get(5).map_err(db_err)?;
    let updated_str: String = row.get(6).map_err(db_err)?;

    let recipient = Recipient::parse(&recipient_str)
        .map_err(|e| DatabaseError::Serialization(format!("Bad recipient in delivery_log: {e}")))?;

    Ok(DeliveryLogEntry {
        id: parse_uuid(&id_str),
        campaign_id: parse_uuid(&campaign_str),
        tenant_id: row.get(2).map_err(db_err)?,
        recipient,
        affirmation: affirmation_str
            .parse::<Affirmation>()
            .map_err(DatabaseError::Serialization)?,
        created_at: parse_datetime(&created_str),
        updated_at: parse_datetime(&updated_str),
    })
}

/// Map a libsql Row to a TrackedLink.
fn row_to_link(row: &libsql::Row) -> Result<TrackedLink, DatabaseError> {
    let id_str: String = row.get(0).map_err(db_err)?;
    let campaign_str: String = row.get(1).map_err(db_err)?;
    let click_count: i64 = row.get(3).map_err(db_err)?;
    let created_str: String = row.get(4).map_err(db_err)?;
    let updated_str: String = row.get(5).map_err(db_err)?;

    Ok(TrackedLink {
        id: parse_uuid(&id_str),
        campaign_id: parse_uuid(&campaign_str),
        original_href: row.get(2).map_err(db_err)?,
        click_count: click_count as u64,
        created_at: parse_datetime(&created_str),
        updated_at: parse_datetime(&updated_str),
    })
}

fn db_err(e: libsql::Error) -> DatabaseError {
    DatabaseError::Query(e.to_string())
}

// ── Trait implementation ────────────────────────────────────────────

const CAMPAIGN_COLUMNS: &str = "id, tenant_id, subject, body_markup, addressing_mode, \
     explicit_recipients, segment_name, from_address, scheduled_at, is_scheduled, status, \
     total_recipients, total_delivered, created_by, updated_by, created_at, updated_at";

const TENANT_COLUMNS: &str = "tenant_id, from_address, consent_active, consent_check_enabled, \
     program_code, brand_code, transport_kind, smtp_host, smtp_port, smtp_username, \
     smtp_password, api_endpoint, api_key, created_at, updated_at";

const LOG_COLUMNS: &str =
    "id, campaign_id, tenant_id, recipient, affirmation, created_at, updated_at";

const LINK_COLUMNS: &str =
    "id, campaign_id, original_href, click_count, created_at, updated_at";

#[async_trait]
impl Store for LibSqlStore {
    async fn init_schema(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    // ── Campaigns ───────────────────────────────────────────────────

    async fn insert_campaign(&self, campaign: &Campaign) -> Result<(), DatabaseError> {
        let (mode, recipients_json, segment_name) = match &campaign.addressing {
            Addressing::ExplicitList { recipients } => (
                "explicit_list",
                Some(serde_json::to_string(recipients).map_err(|e| {
                    DatabaseError::Serialization(format!("recipient list: {e}"))
                })?),
                None,
            ),
            Addressing::Segment { name } => ("segment", None, Some(name.clone())),
        };

        self.conn()
            .execute(
                "INSERT INTO campaigns (id, tenant_id, subject, body_markup, addressing_mode, \
                 explicit_recipients, segment_name, from_address, scheduled_at, is_scheduled, \
                 status, total_recipients, total_delivered, created_by, updated_by, created_at, \
                 updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
                params![
                    campaign.id.to_string(),
                    campaign.tenant_id.clone(),
                    campaign.subject.clone(),
                    campaign.body_markup.clone(),
                    mode,
                    opt_text(recipients_json.as_deref()),
                    opt_text(segment_name.as_deref()),
                    opt_text(campaign.from_address.as_deref()),
                    opt_text(campaign.scheduled_at.map(|t| t.to_rfc3339()).as_deref()),
                    campaign.is_scheduled as i64,
                    campaign.status.to_string(),
                    campaign.total_recipients as i64,
                    campaign.total_delivered as i64,
                    opt_text(campaign.created_by.as_deref()),
                    opt_text(campaign.updated_by.as_deref()),
                    campaign.created_at.to_rfc3339(),
                    campaign.updated_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn get_campaign(&self, id: Uuid) -> Result<Option<Campaign>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = ?1"),
                params![id.to_string()],
            )
            .await
            .map_err(db_err)?;

        match rows.next().await.map_err(db_err)? {
            Some(row) => Ok(Some(row_to_campaign(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_campaigns(
        &self,
        tenant_id: &str,
        limit: usize,
    ) -> Result<Vec<Campaign>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE tenant_id = ?1 \
                     ORDER BY created_at DESC LIMIT ?2"
                ),
                params![tenant_id, limit as i64],
            )
            .await
            .map_err(db_err)?;

        let mut campaigns = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            campaigns.push(row_to_campaign(&row)?);
        }
        Ok(campaigns)
    }

    async fn update_campaign_outcome(
        &self,
        id: Uuid,
        status: CampaignStatus,
        total_recipients: u32,
        total_delivered: u32,
    ) -> Result<(), DatabaseError> {
        let affected = self
            .conn()
            .execute(
                "UPDATE campaigns SET status = ?2, total_recipients = ?3, total_delivered = ?4, \
                 is_scheduled = 0, updated_at = ?5 WHERE id = ?1",
                params![
                    id.to_string(),
                    status.to_string(),
                    total_recipients as i64,
                    total_delivered as i64,
                    Utc::now().to_rfc3339(),
                ],
            )
            .await
            .map_err(db_err)?;

        if affected == 0 {
            return Err(DatabaseError::NotFound {
                entity: "campaign".into(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn list_due_campaigns(
        &self,
        due_before: DateTime<Utc>,
    ) -> Result<Vec<Campaign>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {CAMPAIGN_COLUMNS} FROM campaigns \
                     WHERE is_scheduled = 1 AND scheduled_at IS NOT NULL AND scheduled_at <= ?1 \
                     ORDER BY scheduled_at ASC"
                ),
                params![due_before.to_rfc3339()],
            )
            .await
            .map_err(db_err)?;

        let mut campaigns = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            campaigns.push(row_to_campaign(&row)?);
        }
        Ok(campaigns)
    }

    // ── Tenants ─────────────────────────────────────────────────────

    async fn upsert_tenant(&self, tenant: &TenantConfig) -> Result<(), DatabaseError> {
        let (kind, smtp_host, smtp_port, smtp_username, smtp_password, api_endpoint, api_key) =
            match &tenant.transport {
                TransportKind::Smtp {
                    host,
                    port,
                    username,
                    password,
                } => (
                    "smtp",
                    Some(host.clone()),
                    Some(*port as i64),
                    Some(username.clone()),
                    Some(password.expose_secret().to_string()),
                    None,
                    None,
                ),
                TransportKind::HttpApi { endpoint, api_key } => (
                    "http_api",
                    None,
                    None,
                    None,
                    None,
                    Some(endpoint.clone()),
                    Some(api_key.expose_secret().to_string()),
                ),
            };

        self.conn()
            .execute(
                "INSERT OR REPLACE INTO tenants (tenant_id, from_address, consent_active, \
                 consent_check_enabled, program_code, brand_code, transport_kind, smtp_host, \
                 smtp_port, smtp_username, smtp_password, api_endpoint, api_key, created_at, \
                 updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    tenant.tenant_id.clone(),
                    tenant.from_address.clone(),
                    tenant.consent.active as i64,
                    tenant.consent.check_enabled as i64,
                    tenant.consent.program_code,
                    tenant.consent.brand_code,
                    kind,
                    opt_text(smtp_host.as_deref()),
                    match smtp_port {
                        Some(p) => libsql::Value::Integer(p),
                        None => libsql::Value::Null,
                    },
                    opt_text(smtp_username.as_deref()),
                    opt_text(smtp_password.as_deref()),
                    opt_text(api_endpoint.as_deref()),
                    opt_text(api_key.as_deref()),
                    tenant.created_at.to_rfc3339(),
                    tenant.updated_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn get_tenant(&self, tenant_id: &str) -> Result<Option<TenantConfig>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {TENANT_COLUMNS} FROM tenants WHERE tenant_id = ?1"),
                params![tenant_id],
            )
            .await
            .map_err(db_err)?;

        match rows.next().await.map_err(db_err)? {
            Some(row) => Ok(Some(row_to_tenant(&row)?)),
            None => Ok(None),
        }
    }

    // ── Quota accounts ──────────────────────────────────────────────

    async fn get_quota(
        &self,
        tenant_id: &str,
        message_type: MessageType,
    ) -> Result<Option<QuotaAccount>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT tenant_id, message_type, limit_total, used, updated_at \
                 FROM quota_accounts WHERE tenant_id = ?1 AND message_type = ?2",
                params![tenant_id, message_type.to_string()],
            )
            .await
            .map_err(db_err)?;

        match rows.next().await.map_err(db_err)? {
            Some(row) => {
                let limit: i64 = row.get(2).map_err(db_err)?;
                let used: i64 = row.get(3).map_err(db_err)?;
                let updated_str: String = row.get(4).map_err(db_err)?;
                Ok(Some(QuotaAccount {
                    tenant_id: row.get(0).map_err(db_err)?,
                    message_type,
                    limit: limit as u32,
                    used: used as u32,
                    updated_at: parse_datetime(&updated_str),
                }))
            }
            None => Ok(None),
        }
    }

    async fn upsert_quota(&self, account: &QuotaAccount) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT OR REPLACE INTO quota_accounts \
                 (tenant_id, message_type, limit_total, used, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    account.tenant_id.clone(),
                    account.message_type.to_string(),
                    account.limit as i64,
                    account.used as i64,
                    account.updated_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn debit_quota(
        &self,
        tenant_id: &str,
        message_type: MessageType,
        amount: u32,
    ) -> Result<QuotaAccount, DatabaseError> {
        // Single conditional increment, saturating at the limit. Concurrent
        // debits serialize inside the storage engine, so `used` can never
        // exceed `limit_total` no matter how the callers' reads interleaved.
        let affected = self
            .conn()
            .execute(
                "UPDATE quota_accounts \
                 SET used = MIN(limit_total, used + ?3), updated_at = ?4 \
                 WHERE tenant_id = ?1 AND message_type = ?2",
                params![
                    tenant_id,
                    message_type.to_string(),
                    amount as i64,
                    Utc::now().to_rfc3339(),
                ],
            )
            .await
            .map_err(db_err)?;

        if affected == 0 {
            return Err(DatabaseError::NotFound {
                entity: "quota_account".into(),
                id: format!("{tenant_id}/{message_type}"),
            });
        }

        self.get_quota(tenant_id, message_type)
            .await?
            .ok_or_else(|| DatabaseError::NotFound {
                entity: "quota_account".into(),
                id: format!("{tenant_id}/{message_type}"),
            })
    }

    // ── Delivery log ────────────────────────────────────────────────

    async fn insert_log_entries(&self, entries: &[DeliveryLogEntry]) -> Result<(), DatabaseError> {
        for entry in entries {
            self.conn()
                .execute(
                    &format!(
                        "INSERT INTO delivery_log ({LOG_COLUMNS}) \
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
                    ),
                    params![
                        entry.id.to_string(),
                        entry.campaign_id.to_string(),
                        entry.tenant_id.clone(),
                        entry.recipient.as_str(),
                        entry.affirmation.to_string(),
                        entry.created_at.to_rfc3339(),
                        entry.updated_at.to_rfc3339(),
                    ],
                )
                .await
                .map_err(db_err)?;
        }
        Ok(())
    }

    async fn list_log_entries(
        &self,
        campaign_id: Uuid,
    ) -> Result<Vec<DeliveryLogEntry>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {LOG_COLUMNS} FROM delivery_log WHERE campaign_id = ?1 \
                     ORDER BY created_at ASC"
                ),
                params![campaign_id.to_string()],
            )
            .await
            .map_err(db_err)?;

        let mut entries = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            entries.push(row_to_log_entry(&row)?);
        }
        Ok(entries)
    }

    async fn mark_opened(&self, entry_id: Uuid) -> Result<bool, DatabaseError> {
        let affected = self
            .conn()
            .execute(
                "UPDATE delivery_log SET affirmation = 'opened', updated_at = ?2 \
                 WHERE id = ?1 AND affirmation = 'delivered'",
                params![entry_id.to_string(), Utc::now().to_rfc3339()],
            )
            .await
            .map_err(db_err)?;
        Ok(affected > 0)
    }

    // ── Tracked links ───────────────────────────────────────────────

    async fn insert_links(&self, links: &[TrackedLink]) -> Result<(), DatabaseError> {
        for link in links {
            self.conn()
                .execute(
                    &format!(
                        "INSERT INTO tracked_links ({LINK_COLUMNS}) \
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
                    ),
                    params![
                        link.id.to_string(),
                        link.campaign_id.to_string(),
                        link.original_href.clone(),
                        link.click_count as i64,
                        link.created_at.to_rfc3339(),
                        link.updated_at.to_rfc3339(),
                    ],
                )
                .await
                .map_err(db_err)?;
        }
        Ok(())
    }

    async fn get_link(&self, id: Uuid) -> Result<Option<TrackedLink>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {LINK_COLUMNS} FROM tracked_links WHERE id = ?1"),
                params![id.to_string()],
            )
            .await
            .map_err(db_err)?;

        match rows.next().await.map_err(db_err)? {
            Some(row) => Ok(Some(row_to_link(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_links(&self, campaign_id: Uuid) -> Result<Vec<TrackedLink>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {LINK_COLUMNS} FROM tracked_links WHERE campaign_id = ?1 \
                     ORDER BY created_at ASC"
                ),
                params![campaign_id.to_string()],
            )
            .await
            .map_err(db_err)?;

        let mut links = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            links.push(row_to_link(&row)?);
        }
        Ok(links)
    }

    async fn record_click(&self, id: Uuid) -> Result<Option<TrackedLink>, DatabaseError> {
        let affected = self
            .conn()
            .execute(
                "UPDATE tracked_links SET click_count = click_count + 1, updated_at = ?2 \
                 WHERE id = ?1",
                params![id.to_string(), Utc::now().to_rfc3339()],
            )
            .await
            .map_err(db_err)?;

        if affected == 0 {
            return Ok(None);
        }
        self.get_link(id).await
    }
}
