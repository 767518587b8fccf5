//! End-to-end dispatch pipeline tests against the in-memory store.
//!
//! External collaborators (segment directory, consent registry, transport)
//! are mocked; everything else — store, resolver, consent filter, quota
//! guard, rewriter, dispatcher, delivery log, scheduler sweep — is the real
//! thing.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use secrecy::SecretString;
use uuid::Uuid;

use bulkmail::config::{DispatchConfig, SchedulerConfig};
use bulkmail::dispatch::{
    BatchDispatcher, ConsentRegistry, DispatchOutcome, DispatcherDeps, HrefRewriter,
};
use bulkmail::error::{ConsentError, ResolveError, TransportError};
use bulkmail::model::{
    Addressing, Affirmation, Campaign, CampaignStatus, ConsentSettings, MessageType, QuotaAccount,
    Recipient, TenantConfig, TransportKind,
};
use bulkmail::scheduler;
use bulkmail::segments::SegmentDirectory;
use bulkmail::store::{LibSqlStore, Store};
use bulkmail::transport::{Transport, TransportFactory};

// ── Mocks ───────────────────────────────────────────────────────────

/// Segment directory serving one fixed segment.
struct OneSegment {
    name: &'static str,
    members: Vec<&'static str>,
}

#[async_trait]
impl SegmentDirectory for OneSegment {
    async fn members(&self, _tenant_id: &str, segment: &str) -> Result<Vec<String>, ResolveError> {
        if segment == self.name {
            Ok(self.members.iter().map(|s| s.to_string()).collect())
        } else {
            Err(ResolveError::SegmentUnreachable {
                segment: segment.to_string(),
                reason: "unknown segment".into(),
            })
        }
    }
}

/// Registry blocking a fixed set of addresses.
struct BlockingRegistry {
    blocked: HashSet<&'static str>,
}

#[async_trait]
impl ConsentRegistry for BlockingRegistry {
    async fn consented_subset(
        &self,
        _program_code: i64,
        _brand_code: i64,
        recipients: &[Recipient],
    ) -> Result<Vec<Recipient>, ConsentError> {
        Ok(recipients
            .iter()
            .filter(|r| !self.blocked.contains(r.as_str()))
            .cloned()
            .collect())
    }
}

/// Transport recording every call.
#[derive(Default)]
struct RecordingTransport {
    calls: Mutex<Vec<(String, usize)>>,
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(
        &self,
        from: &str,
        _subject: &str,
        _html: &str,
        recipients: &[Recipient],
    ) -> Result<String, TransportError> {
        self.calls
            .lock()
            .unwrap()
            .push((from.to_string(), recipients.len()));
        Ok("receipt".into())
    }
}

struct RecordingFactory(Arc<RecordingTransport>);

impl TransportFactory for RecordingFactory {
    fn create(&self, _kind: &TransportKind) -> Result<Arc<dyn Transport>, TransportError> {
        Ok(Arc::clone(&self.0) as Arc<dyn Transport>)
    }
}

// ── Fixtures ────────────────────────────────────────────────────────

async fn seed_tenant(store: &Arc<dyn Store>, limit: u32) {
    let now = Utc::now();
    store
        .upsert_tenant(&TenantConfig {
            tenant_id: "acme".into(),
            from_address: "news@acme.example".into(),
            consent: ConsentSettings {
                active: true,
                check_enabled: true,
                program_code: 699905,
                brand_code: 699905,
            },
            transport: TransportKind::Smtp {
                host: "smtp.acme.example".into(),
                port: 587,
                username: "mailer".into(),
                password: SecretString::from("secret".to_string()),
            },
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();

    store
        .upsert_quota(&QuotaAccount {
            tenant_id: "acme".into(),
            message_type: MessageType::Email,
            limit,
            used: 0,
            updated_at: now,
        })
        .await
        .unwrap();
}

fn build_dispatcher(
    store: Arc<dyn Store>,
    transport: Arc<RecordingTransport>,
    blocked: &[&'static str],
) -> Arc<BatchDispatcher> {
    Arc::new(BatchDispatcher::new(
        DispatchConfig::default(),
        DispatcherDeps {
            store,
            segments: Arc::new(OneSegment {
                name: "vip",
                members: vec![
                    "vip1@customer.example",
                    "vip2@customer.example",
                    "vip3@customer.example",
                    "vip1@customer.example", // duplicate, dropped by resolver
                ],
            }),
            registry: Arc::new(BlockingRegistry {
                blocked: blocked.iter().copied().collect(),
            }),
            rewriter: Arc::new(HrefRewriter::new("https://track.acme.example/l/")),
            transports: Arc::new(RecordingFactory(transport)),
        },
    ))
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn segment_campaign_flows_end_to_end() {
    let store: Arc<dyn Store> = Arc::new(LibSqlStore::new_memory().await.unwrap());
    seed_tenant(&store, 100).await;

    let transport = Arc::new(RecordingTransport::default());
    let dispatcher = build_dispatcher(
        Arc::clone(&store),
        Arc::clone(&transport),
        &["vip2@customer.example"],
    );

    let campaign = Campaign::new(
        "acme",
        "VIP preview",
        "<p>Hi</p><a href=\"https://acme.example/preview\">look</a>",
        Addressing::Segment { name: "vip".into() },
        None,
    );
    store.insert_campaign(&campaign).await.unwrap();

    let outcome = dispatcher.dispatch(campaign.id).await.unwrap();
    let summary = match outcome {
        DispatchOutcome::Completed(s) => s,
        other => panic!("Expected completion, got {other:?}"),
    };

    // 4 segment members, 1 duplicate → 3 resolved; 1 blocked → 2 sent.
    assert_eq!(summary.total_recipients, 3);
    assert_eq!(summary.delivered, 2);
    assert_eq!(summary.blocked, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(
        summary.delivered + summary.blocked + summary.failed,
        summary.total_recipients
    );

    // One chunk, sent from the tenant's address.
    let calls = transport.calls.lock().unwrap().clone();
    assert_eq!(calls, vec![("news@acme.example".to_string(), 2)]);

    // Log rows: one per resolved recipient, no duplicates.
    let entries = store.list_log_entries(campaign.id).await.unwrap();
    assert_eq!(entries.len(), 3);
    let unique: HashSet<&str> = entries.iter().map(|e| e.recipient.as_str()).collect();
    assert_eq!(unique.len(), 3);
    assert_eq!(
        entries
            .iter()
            .filter(|e| e.affirmation == Affirmation::ConsentBlocked)
            .map(|e| e.recipient.as_str())
            .collect::<Vec<_>>(),
        vec!["vip2@customer.example"]
    );

    // Link registry persisted and resolvable through the click path.
    let stored = store.get_campaign(campaign.id).await.unwrap().unwrap();
    assert_eq!(stored.status, CampaignStatus::Completed);
    assert_eq!(stored.total_delivered, 2);

    // Quota charged for attempted (post-consent) count only.
    let quota = store.get_quota("acme", MessageType::Email).await.unwrap().unwrap();
    assert_eq!(quota.used, 2);
}

#[tokio::test]
async fn scheduler_sweep_dispatches_due_campaigns_only() {
    let store: Arc<dyn Store> = Arc::new(LibSqlStore::new_memory().await.unwrap());
    seed_tenant(&store, 100).await;

    let transport = Arc::new(RecordingTransport::default());
    let dispatcher = build_dispatcher(Arc::clone(&store), Arc::clone(&transport), &[]);

    let due = Campaign::new(
        "acme",
        "Due now",
        "<p>go</p>",
        Addressing::ExplicitList {
            recipients: vec!["a@x.com".into(), "b@x.com".into()],
        },
        Some(Utc::now() - Duration::minutes(2)),
    );
    let later = Campaign::new(
        "acme",
        "Much later",
        "<p>wait</p>",
        Addressing::ExplicitList {
            recipients: vec!["c@x.com".into()],
        },
        Some(Utc::now() + Duration::hours(6)),
    );
    store.insert_campaign(&due).await.unwrap();
    store.insert_campaign(&later).await.unwrap();

    let config = SchedulerConfig {
        enabled: true,
        interval: std::time::Duration::from_secs(60),
        window: std::time::Duration::from_secs(60),
    };
    scheduler::sweep_once(&config, &store, &dispatcher).await;

    // Only the due campaign was dispatched, and its schedule is consumed.
    let due_after = store.get_campaign(due.id).await.unwrap().unwrap();
    assert_eq!(due_after.status, CampaignStatus::Completed);
    assert!(!due_after.is_scheduled);
    assert_eq!(due_after.total_delivered, 2);

    let later_after = store.get_campaign(later.id).await.unwrap().unwrap();
    assert_eq!(later_after.status, CampaignStatus::Scheduled);
    assert!(later_after.is_scheduled);

    let calls = transport.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 1);

    // A second sweep finds nothing left to do.
    scheduler::sweep_once(&config, &store, &dispatcher).await;
    assert_eq!(transport.calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn rewritten_links_resolve_back_through_the_store() {
    let store: Arc<dyn Store> = Arc::new(LibSqlStore::new_memory().await.unwrap());
    seed_tenant(&store, 100).await;

    let transport = Arc::new(RecordingTransport::default());
    let dispatcher = build_dispatcher(Arc::clone(&store), transport, &[]);

    let campaign = Campaign::new(
        "acme",
        "Links",
        "<a href=\"https://acme.example/a\">a</a><a href=\"https://acme.example/b\">b</a>",
        Addressing::ExplicitList {
            recipients: vec!["a@x.com".into()],
        },
        None,
    );
    store.insert_campaign(&campaign).await.unwrap();

    let outcome = dispatcher.dispatch(campaign.id).await.unwrap();
    let summary = match outcome {
        DispatchOutcome::Completed(s) => s,
        other => panic!("Expected completion, got {other:?}"),
    };
    assert_eq!(summary.links_tracked, 2);

    let links = store.list_links(campaign.id).await.unwrap();
    assert_eq!(links.len(), 2);
    let hrefs: HashSet<&str> = links.iter().map(|l| l.original_href.as_str()).collect();
    assert!(hrefs.contains("https://acme.example/a"));
    assert!(hrefs.contains("https://acme.example/b"));

    // Clicks resolve and count against the stored links.
    let clicked = store.record_click(links[0].id).await.unwrap().unwrap();
    assert_eq!(clicked.click_count, 1);
    assert_eq!(clicked.original_href, links[0].original_href);
    assert!(store.record_click(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn quota_exhaustion_defers_scheduled_campaign() {
    let store: Arc<dyn Store> = Arc::new(LibSqlStore::new_memory().await.unwrap());
    seed_tenant(&store, 1).await; // room for exactly one send

    let transport = Arc::new(RecordingTransport::default());
    let dispatcher = build_dispatcher(Arc::clone(&store), Arc::clone(&transport), &[]);

    let campaign = Campaign::new(
        "acme",
        "Too big",
        "<p>hi</p>",
        Addressing::ExplicitList {
            recipients: vec!["a@x.com".into(), "b@x.com".into(), "c@x.com".into()],
        },
        Some(Utc::now() - Duration::minutes(1)),
    );
    store.insert_campaign(&campaign).await.unwrap();

    let config = SchedulerConfig {
        enabled: true,
        interval: std::time::Duration::from_secs(60),
        window: std::time::Duration::from_secs(60),
    };
    scheduler::sweep_once(&config, &store, &dispatcher).await;

    // Nothing sent, campaign still scheduled for a later retry.
    assert!(transport.calls.lock().unwrap().is_empty());
    let after = store.get_campaign(campaign.id).await.unwrap().unwrap();
    assert!(after.is_scheduled);
    assert_eq!(after.status, CampaignStatus::Scheduled);

    let quota = store.get_quota("acme", MessageType::Email).await.unwrap().unwrap();
    assert_eq!(quota.used, 0);
}
