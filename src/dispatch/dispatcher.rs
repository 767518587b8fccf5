//! Batch dispatcher — the orchestration core of a campaign dispatch run.
//!
//! One run is one sequential pipeline:
//! resolve → consent-check → quota-check → rewrite → chunked sends → log →
//! persist outcome → commit quota.
//!
//! Failure handling is split at the moment the first send goes out:
//! everything before it aborts the run with no side effects; everything
//! after it is isolated to the smallest unit possible (a chunk), so a bad
//! recipient or a transient provider error never discards work already
//! completed for other recipients.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::DispatchConfig;
use crate::dispatch::consent::{ConsentFilter, ConsentRegistry};
use crate::dispatch::delivery_log::DeliveryLog;
use crate::dispatch::quota::{QuotaGuard, Reservation};
use crate::dispatch::resolver::RecipientResolver;
use crate::dispatch::rewrite::MarkupRewriter;
use crate::error::DispatchError;
use crate::model::{
    Affirmation, Campaign, CampaignStatus, DeliveryLogEntry, MessageType, Recipient, TenantConfig,
};
use crate::segments::SegmentDirectory;
use crate::store::Store;
use crate::transport::TransportFactory;

/// Pipeline stage of a dispatch run. `Failed` is terminal and reachable
/// from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Resolving,
    ConsentChecking,
    QuotaChecking,
    Rewriting,
    Sending,
    Logging,
    Completed,
    Failed,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Resolving => "resolving",
            Self::ConsentChecking => "consent_checking",
            Self::QuotaChecking => "quota_checking",
            Self::Rewriting => "rewriting",
            Self::Sending => "sending",
            Self::Logging => "logging",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Completion summary of a run. The caller always gets the full counts,
/// even when some chunks failed.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DispatchSummary {
    pub campaign_id: Uuid,
    pub total_recipients: u32,
    pub delivered: u32,
    pub blocked: u32,
    pub failed: u32,
    pub chunks_attempted: u32,
    pub chunks_failed: u32,
    pub links_tracked: u32,
    pub log_batches_failed: u32,
}

/// What a dispatch run reported back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The run reached the end of the pipeline.
    Completed(DispatchSummary),
    /// Remaining allowance was too small; nothing was sent and the
    /// campaign is left as it was, eligible for a retry once quota frees
    /// up.
    QuotaExceeded {
        limit: u32,
        used: u32,
        remaining: u32,
        requested: u32,
    },
}

/// External collaborators a dispatcher is wired with.
pub struct DispatcherDeps {
    pub store: Arc<dyn Store>,
    pub segments: Arc<dyn SegmentDirectory>,
    pub registry: Arc<dyn ConsentRegistry>,
    pub rewriter: Arc<dyn MarkupRewriter>,
    pub transports: Arc<dyn TransportFactory>,
}

/// Orchestrates dispatch runs. Multiple runs (different campaigns) may
/// execute concurrently; the quota store's conditional increment is the
/// only synchronization between them.
pub struct BatchDispatcher {
    config: DispatchConfig,
    store: Arc<dyn Store>,
    resolver: RecipientResolver,
    consent: ConsentFilter,
    quota: QuotaGuard,
    rewriter: Arc<dyn MarkupRewriter>,
    transports: Arc<dyn TransportFactory>,
    delivery_log: DeliveryLog,
}

impl BatchDispatcher {
    pub fn new(config: DispatchConfig, deps: DispatcherDeps) -> Self {
        let DispatcherDeps {
            store,
            segments,
            registry,
            rewriter,
            transports,
        } = deps;

        Self {
            resolver: RecipientResolver::new(segments),
            consent: ConsentFilter::new(registry),
            quota: QuotaGuard::new(Arc::clone(&store)),
            delivery_log: DeliveryLog::new(Arc::clone(&store), config.log_batch_size),
            rewriter,
            transports,
            store,
            config,
        }
    }

    /// Run the pipeline for a stored campaign.
    pub async fn dispatch(&self, campaign_id: Uuid) -> Result<DispatchOutcome, DispatchError> {
        let campaign = self
            .store
            .get_campaign(campaign_id)
            .await?
            .ok_or(DispatchError::CampaignNotFound(campaign_id))?;

        let tenant = self
            .store
            .get_tenant(&campaign.tenant_id)
            .await?
            .ok_or_else(|| DispatchError::TenantNotFound(campaign.tenant_id.clone()))?;

        self.run(&campaign, &tenant).await
    }

    async fn run(
        &self,
        campaign: &Campaign,
        tenant: &TenantConfig,
    ) -> Result<DispatchOutcome, DispatchError> {
        let mut state = RunState::Resolving;
        info!(campaign = %campaign.id, tenant = %tenant.tenant_id, "Dispatch run starting");

        // ── Resolve ─────────────────────────────────────────────────
        let resolved = self
            .resolver
            .resolve(campaign)
            .await
            .map_err(|e| self.fail(campaign.id, state, e))?;

        if resolved.is_empty() {
            // Nothing to send is a completion, not a failure.
            self.store
                .update_campaign_outcome(campaign.id, CampaignStatus::Completed, 0, 0)
                .await?;
            info!(campaign = %campaign.id, "Empty recipient set — run complete");
            return Ok(DispatchOutcome::Completed(DispatchSummary {
                campaign_id: campaign.id,
                total_recipients: 0,
                delivered: 0,
                blocked: 0,
                failed: 0,
                chunks_attempted: 0,
                chunks_failed: 0,
                links_tracked: 0,
                log_batches_failed: 0,
            }));
        }
        let total_recipients = resolved.len() as u32;

        // ── Consent ─────────────────────────────────────────────────
        state = self.advance(campaign.id, RunState::ConsentChecking);
        let partition = self
            .consent
            .filter(tenant, &resolved)
            .await
            .map_err(|e| self.fail(campaign.id, state, e))?;

        // ── Quota ───────────────────────────────────────────────────
        state = self.advance(campaign.id, RunState::QuotaChecking);
        let attempted = partition.consented.len() as u32;
        match self
            .quota
            .try_reserve(&tenant.tenant_id, MessageType::Email, attempted)
            .await
            .map_err(|e| self.fail(campaign.id, state, e))?
        {
            Reservation::Rejected {
                limit,
                used,
                remaining,
                requested,
            } => {
                info!(
                    campaign = %campaign.id,
                    tenant = %tenant.tenant_id,
                    requested,
                    remaining,
                    "Quota exceeded — aborting before any send"
                );
                return Ok(DispatchOutcome::QuotaExceeded {
                    limit,
                    used,
                    remaining,
                    requested,
                });
            }
            Reservation::Accepted { remaining } => {
                debug!(campaign = %campaign.id, requested = attempted, remaining, "Quota reserved");
            }
        }

        // ── Rewrite ─────────────────────────────────────────────────
        self.advance(campaign.id, RunState::Rewriting);
        let rewritten = self.rewriter.rewrite(campaign.id, &campaign.body_markup);

        // ── Send ────────────────────────────────────────────────────
        state = self.advance(campaign.id, RunState::Sending);
        let transport = self
            .transports
            .create(&tenant.transport)
            .map_err(|e| self.fail(campaign.id, state, e))?;
        let from = campaign
            .from_address
            .as_deref()
            .unwrap_or(&tenant.from_address);

        let mut delivered: Vec<Recipient> = Vec::with_capacity(partition.consented.len());
        let mut failed: Vec<Recipient> = Vec::new();
        let mut chunks_attempted = 0u32;
        let mut chunks_failed = 0u32;

        for chunk in partition.consented.chunks(self.config.chunk_size) {
            chunks_attempted += 1;
            let send = transport.send(from, &campaign.subject, &rewritten.markup, chunk);
            match tokio::time::timeout(self.config.send_timeout, send).await {
                Ok(Ok(receipt)) => {
                    debug!(
                        campaign = %campaign.id,
                        chunk = chunks_attempted,
                        size = chunk.len(),
                        %receipt,
                        "Chunk accepted by transport"
                    );
                    delivered.extend_from_slice(chunk);
                }
                Ok(Err(e)) => {
                    warn!(
                        campaign = %campaign.id,
                        chunk = chunks_attempted,
                        size = chunk.len(),
                        error = %e,
                        "Chunk send failed — continuing with remaining chunks"
                    );
                    failed.extend_from_slice(chunk);
                    chunks_failed += 1;
                }
                Err(_) => {
                    warn!(
                        campaign = %campaign.id,
                        chunk = chunks_attempted,
                        size = chunk.len(),
                        timeout_secs = self.config.send_timeout.as_secs(),
                        "Chunk send timed out — continuing with remaining chunks"
                    );
                    failed.extend_from_slice(chunk);
                    chunks_failed += 1;
                }
            }
        }

        // ── Log ─────────────────────────────────────────────────────
        self.advance(campaign.id, RunState::Logging);
        let mut entries: Vec<DeliveryLogEntry> = Vec::with_capacity(resolved.len());
        for recipient in &delivered {
            entries.push(DeliveryLogEntry::new(
                campaign.id,
                tenant.tenant_id.as_str(),
                recipient.clone(),
                Affirmation::Delivered,
            ));
        }
        for recipient in &failed {
            entries.push(DeliveryLogEntry::new(
                campaign.id,
                tenant.tenant_id.as_str(),
                recipient.clone(),
                Affirmation::Failed,
            ));
        }
        for recipient in &partition.blocked {
            entries.push(DeliveryLogEntry::new(
                campaign.id,
                tenant.tenant_id.as_str(),
                recipient.clone(),
                Affirmation::ConsentBlocked,
            ));
        }

        let append = self.delivery_log.append(&entries).await;
        if !append.fully_written() {
            warn!(
                campaign = %campaign.id,
                failed_batches = append.failed_batches,
                "Some delivery log batches were not written"
            );
        }

        if !rewritten.links.is_empty() {
            if let Err(e) = self.store.insert_links(&rewritten.links).await {
                warn!(campaign = %campaign.id, error = %e, "Failed to persist tracked links");
            }
        }

        // ── Outcome ─────────────────────────────────────────────────
        let delivered_count = delivered.len() as u32;
        let status = if attempted > 0 && delivered_count == 0 {
            CampaignStatus::Failed
        } else {
            CampaignStatus::Completed
        };
        self.store
            .update_campaign_outcome(campaign.id, status, total_recipients, delivered_count)
            .await?;

        // Quota tracks attempts, not confirmed deliveries; the single
        // aggregate debit waits for every chunk attempt to finish.
        if attempted > 0 {
            if let Err(e) = self
                .quota
                .commit(&tenant.tenant_id, MessageType::Email, attempted)
                .await
            {
                tracing::error!(
                    campaign = %campaign.id,
                    tenant = %tenant.tenant_id,
                    attempted,
                    error = %e,
                    "Quota commit failed after send attempts"
                );
            }
        }

        self.advance(campaign.id, RunState::Completed);
        let summary = DispatchSummary {
            campaign_id: campaign.id,
            total_recipients,
            delivered: delivered_count,
            blocked: partition.blocked.len() as u32,
            failed: failed.len() as u32,
            chunks_attempted,
            chunks_failed,
            links_tracked: rewritten.links.len() as u32,
            log_batches_failed: append.failed_batches as u32,
        };
        info!(
            campaign = %campaign.id,
            delivered = summary.delivered,
            blocked = summary.blocked,
            failed = summary.failed,
            "Dispatch run complete"
        );
        Ok(DispatchOutcome::Completed(summary))
    }

    fn advance(&self, campaign_id: Uuid, next: RunState) -> RunState {
        debug!(campaign = %campaign_id, state = %next, "Run state");
        next
    }

    fn fail<E: Into<DispatchError>>(&self, campaign_id: Uuid, state: RunState, e: E) -> DispatchError {
        let error = e.into();
        warn!(
            campaign = %campaign_id,
            state = %state,
            terminal = %RunState::Failed,
            error = %error,
            "Dispatch run failed before completion"
        );
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;
    use secrecy::SecretString;

    use crate::dispatch::rewrite::HrefRewriter;
    use crate::error::{ConsentError, ResolveError, TransportError};
    use crate::model::{Addressing, ConsentSettings, QuotaAccount, TransportKind};
    use crate::store::LibSqlStore;
    use crate::transport::Transport;

    // ── Mocks ───────────────────────────────────────────────────────

    struct NoSegments;

    #[async_trait]
    impl SegmentDirectory for NoSegments {
        async fn members(
            &self,
            _tenant_id: &str,
            segment: &str,
        ) -> Result<Vec<String>, ResolveError> {
            Err(ResolveError::SegmentUnreachable {
                segment: segment.to_string(),
                reason: "no directory in this test".into(),
            })
        }
    }

    /// Registry that blocks a fixed set of addresses (or fails outright).
    struct TestRegistry {
        blocked: Vec<&'static str>,
        fail: bool,
    }

    #[async_trait]
    impl ConsentRegistry for TestRegistry {
        async fn consented_subset(
            &self,
            _program_code: i64,
            _brand_code: i64,
            recipients: &[Recipient],
        ) -> Result<Vec<Recipient>, ConsentError> {
            if self.fail {
                return Err(ConsentError::CheckFailed {
                    reason: "registry down".into(),
                });
            }
            Ok(recipients
                .iter()
                .filter(|r| !self.blocked.contains(&r.as_str()))
                .cloned()
                .collect())
        }
    }

    /// Transport that records chunk sizes and fails chosen chunk indices.
    struct TestTransport {
        fail_chunks: HashSet<usize>,
        calls: Mutex<Vec<usize>>,
    }

    impl TestTransport {
        fn new(fail_chunks: &[usize]) -> Arc<Self> {
            Arc::new(Self {
                fail_chunks: fail_chunks.iter().copied().collect(),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn chunk_sizes(&self) -> Vec<usize> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for TestTransport {
        async fn send(
            &self,
            _from: &str,
            _subject: &str,
            _html: &str,
            recipients: &[Recipient],
        ) -> Result<String, TransportError> {
            let index = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(recipients.len());
                calls.len() - 1
            };
            if self.fail_chunks.contains(&index) {
                return Err(TransportError::Send("relay refused".into()));
            }
            Ok(format!("receipt-{index}"))
        }
    }

    struct FixedFactory(Arc<TestTransport>);

    impl TransportFactory for FixedFactory {
        fn create(
            &self,
            _kind: &TransportKind,
        ) -> Result<Arc<dyn Transport>, TransportError> {
            Ok(Arc::clone(&self.0) as Arc<dyn Transport>)
        }
    }

    // ── Fixtures ────────────────────────────────────────────────────

    struct TestEnv {
        dispatcher: BatchDispatcher,
        store: Arc<dyn Store>,
        transport: Arc<TestTransport>,
    }

    async fn env(
        quota: (u32, u32),
        blocked: Vec<&'static str>,
        registry_fails: bool,
        fail_chunks: &[usize],
    ) -> TestEnv {
        let store: Arc<dyn Store> = Arc::new(LibSqlStore::new_memory().await.unwrap());
        let now = Utc::now();

        store
            .upsert_tenant(&TenantConfig {
                tenant_id: "t1".into(),
                from_address: "news@acme.example".into(),
                consent: ConsentSettings {
                    active: true,
                    check_enabled: true,
                    program_code: 1,
                    brand_code: 1,
                },
                transport: TransportKind::HttpApi {
                    endpoint: "https://mail.example/send".into(),
                    api_key: SecretString::from("k".to_string()),
                },
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        store
            .upsert_quota(&QuotaAccount {
                tenant_id: "t1".into(),
                message_type: MessageType::Email,
                limit: quota.0,
                used: quota.1,
                updated_at: now,
            })
            .await
            .unwrap();

        let transport = TestTransport::new(fail_chunks);
        let dispatcher = BatchDispatcher::new(
            DispatchConfig::default(),
            DispatcherDeps {
                store: Arc::clone(&store),
                segments: Arc::new(NoSegments),
                registry: Arc::new(TestRegistry {
                    blocked,
                    fail: registry_fails,
                }),
                rewriter: Arc::new(HrefRewriter::new("https://track.example/l/")),
                transports: Arc::new(FixedFactory(Arc::clone(&transport))),
            },
        );

        TestEnv {
            dispatcher,
            store,
            transport,
        }
    }

    async fn seed_campaign(store: &Arc<dyn Store>, count: usize) -> Campaign {
        let recipients: Vec<String> = (0..count).map(|i| format!("user{i}@x.com")).collect();
        let campaign = Campaign::new(
            "t1",
            "Spring sale",
            "<p>Hi!</p><a href=\"https://acme.example/shop\">shop now</a>",
            Addressing::ExplicitList { recipients },
            None,
        );
        store.insert_campaign(&campaign).await.unwrap();
        campaign
    }

    fn summary(outcome: DispatchOutcome) -> DispatchSummary {
        match outcome {
            DispatchOutcome::Completed(s) => s,
            other => panic!("Expected completion, got {other:?}"),
        }
    }

    // ── Scenarios ───────────────────────────────────────────────────

    #[tokio::test]
    async fn two_hundred_fifty_recipients_make_three_chunked_calls() {
        let env = env((1000, 0), vec![], false, &[]).await;
        let campaign = seed_campaign(&env.store, 250).await;

        let outcome = env.dispatcher.dispatch(campaign.id).await.unwrap();
        let s = summary(outcome);

        assert_eq!(env.transport.chunk_sizes(), vec![100, 100, 50]);
        assert_eq!(s.delivered, 250);
        assert_eq!(s.failed, 0);
        assert_eq!(s.blocked, 0);
        assert_eq!(s.chunks_attempted, 3);
        assert_eq!(s.chunks_failed, 0);

        let entries = env.store.list_log_entries(campaign.id).await.unwrap();
        assert_eq!(entries.len(), 250);
        assert!(entries.iter().all(|e| e.affirmation == Affirmation::Delivered));

        let stored = env.store.get_campaign(campaign.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CampaignStatus::Completed);
        assert_eq!(stored.total_delivered, 250);
        assert!(!stored.is_scheduled);
    }

    #[tokio::test]
    async fn middle_chunk_failure_does_not_abort_the_run() {
        let env = env((1000, 0), vec![], false, &[1]).await;
        let campaign = seed_campaign(&env.store, 250).await;

        let s = summary(env.dispatcher.dispatch(campaign.id).await.unwrap());

        assert_eq!(env.transport.chunk_sizes(), vec![100, 100, 50]);
        assert_eq!(s.delivered, 150);
        assert_eq!(s.failed, 100);
        assert_eq!(s.chunks_failed, 1);

        let entries = env.store.list_log_entries(campaign.id).await.unwrap();
        let delivered = entries
            .iter()
            .filter(|e| e.affirmation == Affirmation::Delivered)
            .count();
        let failed = entries
            .iter()
            .filter(|e| e.affirmation == Affirmation::Failed)
            .count();
        assert_eq!((delivered, failed), (150, 100));

        // Quota is charged for attempts, including the failed chunk.
        let quota = env.store.get_quota("t1", MessageType::Email).await.unwrap().unwrap();
        assert_eq!(quota.used, 250);
    }

    #[tokio::test]
    async fn quota_rejection_aborts_before_any_transport_call() {
        let env = env((300, 280), vec![], false, &[]).await;
        let campaign = seed_campaign(&env.store, 25).await;

        let outcome = env.dispatcher.dispatch(campaign.id).await.unwrap();
        assert_eq!(
            outcome,
            DispatchOutcome::QuotaExceeded {
                limit: 300,
                used: 280,
                remaining: 20,
                requested: 25,
            }
        );

        assert!(env.transport.chunk_sizes().is_empty());
        assert!(env.store.list_log_entries(campaign.id).await.unwrap().is_empty());

        // Campaign left as it was, retryable once quota frees up.
        let stored = env.store.get_campaign(campaign.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CampaignStatus::Draft);
        let quota = env.store.get_quota("t1", MessageType::Email).await.unwrap().unwrap();
        assert_eq!(quota.used, 280);
    }

    #[tokio::test]
    async fn blocked_recipients_are_logged_but_never_sent() {
        let env = env(
            (100, 0),
            vec!["user1@x.com", "user3@x.com"],
            false,
            &[],
        )
        .await;
        let campaign = seed_campaign(&env.store, 5).await;

        let s = summary(env.dispatcher.dispatch(campaign.id).await.unwrap());
        assert_eq!(s.total_recipients, 5);
        assert_eq!(s.delivered, 3);
        assert_eq!(s.blocked, 2);
        assert_eq!(s.failed, 0);
        assert_eq!(s.delivered + s.blocked + s.failed, s.total_recipients);

        let entries = env.store.list_log_entries(campaign.id).await.unwrap();
        assert_eq!(entries.len(), 5);
        let blocked: Vec<&str> = entries
            .iter()
            .filter(|e| e.affirmation == Affirmation::ConsentBlocked)
            .map(|e| e.recipient.as_str())
            .collect();
        assert_eq!(blocked, vec!["user1@x.com", "user3@x.com"]);

        // Quota charged for the 3 attempted, not the 5 resolved.
        let quota = env.store.get_quota("t1", MessageType::Email).await.unwrap().unwrap();
        assert_eq!(quota.used, 3);
    }

    #[tokio::test]
    async fn empty_recipient_set_completes_immediately() {
        let env = env((100, 0), vec![], false, &[]).await;
        let campaign = seed_campaign(&env.store, 0).await;

        let s = summary(env.dispatcher.dispatch(campaign.id).await.unwrap());
        assert_eq!(s.total_recipients, 0);
        assert_eq!(s.delivered, 0);
        assert!(env.transport.chunk_sizes().is_empty());

        let stored = env.store.get_campaign(campaign.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CampaignStatus::Completed);
    }

    #[tokio::test]
    async fn consent_failure_aborts_with_no_side_effects() {
        let env = env((100, 0), vec![], true, &[]).await;
        let campaign = seed_campaign(&env.store, 10).await;

        let err = env.dispatcher.dispatch(campaign.id).await.unwrap_err();
        assert!(matches!(err, DispatchError::Consent(ConsentError::CheckFailed { .. })));

        assert!(env.transport.chunk_sizes().is_empty());
        assert!(env.store.list_log_entries(campaign.id).await.unwrap().is_empty());
        let quota = env.store.get_quota("t1", MessageType::Email).await.unwrap().unwrap();
        assert_eq!(quota.used, 0);
        let stored = env.store.get_campaign(campaign.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CampaignStatus::Draft);
    }

    #[tokio::test]
    async fn total_transport_failure_still_reaches_completion() {
        let env = env((1000, 0), vec![], false, &[0, 1, 2]).await;
        let campaign = seed_campaign(&env.store, 250).await;

        let s = summary(env.dispatcher.dispatch(campaign.id).await.unwrap());
        assert_eq!(s.delivered, 0);
        assert_eq!(s.failed, 250);
        assert_eq!(s.chunks_failed, 3);

        let entries = env.store.list_log_entries(campaign.id).await.unwrap();
        assert_eq!(entries.len(), 250);
        assert!(entries.iter().all(|e| e.affirmation == Affirmation::Failed));

        // Never left dangling: the campaign lands in a terminal state.
        let stored = env.store.get_campaign(campaign.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CampaignStatus::Failed);
        // Attempts are still charged.
        let quota = env.store.get_quota("t1", MessageType::Email).await.unwrap().unwrap();
        assert_eq!(quota.used, 250);
    }

    #[tokio::test]
    async fn tracked_links_are_persisted_for_the_run() {
        let env = env((100, 0), vec![], false, &[]).await;
        let campaign = seed_campaign(&env.store, 2).await;

        let s = summary(env.dispatcher.dispatch(campaign.id).await.unwrap());
        assert_eq!(s.links_tracked, 1);

        let entries = env.store.list_log_entries(campaign.id).await.unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[tokio::test]
    async fn unknown_campaign_is_an_error() {
        let env = env((100, 0), vec![], false, &[]).await;
        let err = env.dispatcher.dispatch(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, DispatchError::CampaignNotFound(_)));
    }
}
