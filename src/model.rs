//! Campaign data model — campaigns, recipients, quota accounts, tracked
//! links and delivery-log entries.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Recipient ───────────────────────────────────────────────────────

/// A validated email address. Value type — uniqueness is enforced within a
/// campaign's resolved set, not globally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Recipient(String);

impl Recipient {
    /// Parse and lightly validate an address. Rejects empty strings,
    /// whitespace, and anything without exactly one `@` separating a
    /// non-empty local part from a domain containing a dot.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let s = raw.trim();
        if s.is_empty() {
            return Err("empty address".into());
        }
        if s.chars().any(char::is_whitespace) {
            return Err(format!("address contains whitespace: {raw}"));
        }
        let mut parts = s.splitn(2, '@');
        let local = parts.next().unwrap_or_default();
        let domain = parts.next().unwrap_or_default();
        if local.is_empty() || domain.is_empty() || domain.contains('@') {
            return Err(format!("malformed address: {raw}"));
        }
        if !domain.contains('.') {
            return Err(format!("address domain has no dot: {raw}"));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Recipient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Recipient {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ── Campaign ────────────────────────────────────────────────────────

/// How a campaign addresses its recipients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum Addressing {
    /// An explicit list of addresses supplied at submission time.
    ExplicitList { recipients: Vec<String> },
    /// A named segment resolved through the segment directory.
    Segment { name: String },
}

/// Campaign lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    /// Submitted, not yet dispatched.
    Draft,
    /// Waiting for its scheduled time.
    Scheduled,
    /// A dispatch run is in flight.
    Sending,
    /// Dispatch run finished (possibly with per-chunk failures).
    Completed,
    /// Dispatch run finished with zero deliveries despite attempts.
    Failed,
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Scheduled => write!(f, "scheduled"),
            Self::Sending => write!(f, "sending"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for CampaignStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "scheduled" => Ok(Self::Scheduled),
            "sending" => Ok(Self::Sending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Unknown campaign status: {s}")),
        }
    }
}

/// One email-sending request, scheduled or immediate.
///
/// The recipient set is immutable once dispatch begins; the dispatcher only
/// writes back `status`, `total_recipients` and `total_delivered`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Uuid,
    pub tenant_id: String,
    pub subject: String,
    pub body_markup: String,
    pub addressing: Addressing,
    pub from_address: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub is_scheduled: bool,
    pub status: CampaignStatus,
    pub total_recipients: u32,
    pub total_delivered: u32,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    /// Build a new campaign in its initial state. `scheduled_at` in the
    /// future makes it a scheduled campaign picked up by the sweep.
    pub fn new(
        tenant_id: impl Into<String>,
        subject: impl Into<String>,
        body_markup: impl Into<String>,
        addressing: Addressing,
        scheduled_at: Option<DateTime<Utc>>,
    ) -> Self {
        let now = Utc::now();
        let is_scheduled = scheduled_at.is_some();
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.into(),
            subject: subject.into(),
            body_markup: body_markup.into(),
            addressing,
            from_address: None,
            scheduled_at,
            is_scheduled,
            status: if is_scheduled {
                CampaignStatus::Scheduled
            } else {
                CampaignStatus::Draft
            },
            total_recipients: 0,
            total_delivered: 0,
            created_by: None,
            updated_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_from_address(mut self, from: impl Into<String>) -> Self {
        self.from_address = Some(from.into());
        self
    }

    pub fn with_created_by(mut self, who: impl Into<String>) -> Self {
        self.created_by = Some(who.into());
        self
    }
}

// ── Quota ───────────────────────────────────────────────────────────

/// Message category a quota account covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Email,
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Email => write!(f, "email"),
        }
    }
}

impl std::str::FromStr for MessageType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(Self::Email),
            _ => Err(format!("Unknown message type: {s}")),
        }
    }
}

/// A tenant's send allowance for one message type.
///
/// Invariant: `0 <= used <= limit` at all times. `used` only moves through
/// the store's conditional increment, never a blind overwrite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaAccount {
    pub tenant_id: String,
    pub message_type: MessageType,
    pub limit: u32,
    pub used: u32,
    pub updated_at: DateTime<Utc>,
}

impl QuotaAccount {
    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.used)
    }
}

// ── Tracked links ───────────────────────────────────────────────────

/// An outbound link rewritten to route through the click-redirect endpoint.
/// `click_count` is mutated only by that handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedLink {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub original_href: String,
    pub click_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ── Delivery log ────────────────────────────────────────────────────

/// Per-recipient outcome of a dispatch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Affirmation {
    /// Transport accepted the message for this recipient.
    Delivered,
    /// Recipient was filtered out by the consent registry.
    ConsentBlocked,
    /// Transport failed for this recipient's chunk.
    Failed,
    /// An open signal arrived for a delivered message.
    Opened,
}

impl std::fmt::Display for Affirmation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Delivered => write!(f, "delivered"),
            Self::ConsentBlocked => write!(f, "consent_blocked"),
            Self::Failed => write!(f, "failed"),
            Self::Opened => write!(f, "opened"),
        }
    }
}

impl std::str::FromStr for Affirmation {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delivered" => Ok(Self::Delivered),
            "consent_blocked" => Ok(Self::ConsentBlocked),
            "failed" => Ok(Self::Failed),
            "opened" => Ok(Self::Opened),
            _ => Err(format!("Unknown affirmation: {s}")),
        }
    }
}

/// Append-only record of one outcome per (campaign, recipient) per run.
/// Entry ids are freshly generated per run, so a re-run of a failed
/// campaign adds rows alongside the prior attempt's instead of overwriting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryLogEntry {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub tenant_id: String,
    pub recipient: Recipient,
    pub affirmation: Affirmation,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DeliveryLogEntry {
    pub fn new(
        campaign_id: Uuid,
        tenant_id: impl Into<String>,
        recipient: Recipient,
        affirmation: Affirmation,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            campaign_id,
            tenant_id: tenant_id.into(),
            recipient,
            affirmation,
            created_at: now,
            updated_at: now,
        }
    }
}

// ── Tenant configuration ────────────────────────────────────────────

/// Per-tenant consent registry settings.
#[derive(Debug, Clone)]
pub struct ConsentSettings {
    /// Registry registration is live for this tenant. Missing or inactive
    /// settings make consent checks fail, never pass-through.
    pub active: bool,
    /// Explicit bypass flag. When false the filter treats every recipient
    /// as consented and says so in the logs.
    pub check_enabled: bool,
    pub program_code: i64,
    pub brand_code: i64,
}

/// Which transport implementation a tenant sends through.
#[derive(Clone)]
pub enum TransportKind {
    /// SMTP relay (lettre).
    Smtp {
        host: String,
        port: u16,
        username: String,
        password: SecretString,
    },
    /// Transactional HTTP provider with a JSON send endpoint.
    HttpApi {
        endpoint: String,
        api_key: SecretString,
    },
}

impl std::fmt::Debug for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Smtp { host, port, username, .. } => f
                .debug_struct("Smtp")
                .field("host", host)
                .field("port", port)
                .field("username", username)
                .finish_non_exhaustive(),
            Self::HttpApi { endpoint, .. } => f
                .debug_struct("HttpApi")
                .field("endpoint", endpoint)
                .finish_non_exhaustive(),
        }
    }
}

/// Tenant-level configuration the dispatcher reads at the start of a run.
#[derive(Debug, Clone)]
pub struct TenantConfig {
    pub tenant_id: String,
    pub from_address: String,
    pub consent: ConsentSettings,
    pub transport: TransportKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipient_parse_accepts_normal_address() {
        let r = Recipient::parse("Alice@Example.com").unwrap();
        assert_eq!(r.as_str(), "alice@example.com");
    }

    #[test]
    fn recipient_parse_rejects_junk() {
        assert!(Recipient::parse("").is_err());
        assert!(Recipient::parse("   ").is_err());
        assert!(Recipient::parse("no-at-sign").is_err());
        assert!(Recipient::parse("two@@ats@x.com").is_err());
        assert!(Recipient::parse("spaces in@x.com").is_err());
        assert!(Recipient::parse("@example.com").is_err());
        assert!(Recipient::parse("user@").is_err());
        assert!(Recipient::parse("user@nodot").is_err());
    }

    #[test]
    fn campaign_new_scheduled_gets_scheduled_status() {
        let c = Campaign::new(
            "tenant-1",
            "Hello",
            "<p>hi</p>",
            Addressing::Segment { name: "vip".into() },
            Some(Utc::now()),
        );
        assert!(c.is_scheduled);
        assert_eq!(c.status, CampaignStatus::Scheduled);
    }

    #[test]
    fn campaign_new_immediate_is_draft() {
        let c = Campaign::new(
            "tenant-1",
            "Hello",
            "<p>hi</p>",
            Addressing::ExplicitList { recipients: vec![] },
            None,
        );
        assert!(!c.is_scheduled);
        assert_eq!(c.status, CampaignStatus::Draft);
    }

    #[test]
    fn quota_remaining_saturates() {
        let q = QuotaAccount {
            tenant_id: "t".into(),
            message_type: MessageType::Email,
            limit: 10,
            used: 10,
            updated_at: Utc::now(),
        };
        assert_eq!(q.remaining(), 0);
    }

    #[test]
    fn affirmation_round_trips_through_strings() {
        for a in [
            Affirmation::Delivered,
            Affirmation::ConsentBlocked,
            Affirmation::Failed,
            Affirmation::Opened,
        ] {
            assert_eq!(a.to_string().parse::<Affirmation>().unwrap(), a);
        }
    }
}
