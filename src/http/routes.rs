//! REST endpoints — campaign submission, click redirect, open tracking
//! and quota figures.
//!
//! Handlers stay thin: decode, call the core or the store, encode. The
//! dispatch pipeline itself lives in `dispatch::dispatcher`.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::error;
use uuid::Uuid;

use crate::dispatch::{BatchDispatcher, DispatchOutcome};
use crate::error::{DatabaseError, DispatchError};
use crate::model::{Addressing, Campaign, MessageType};
use crate::store::Store;

/// Shared state for the API routes.
#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<dyn Store>,
    pub dispatcher: Arc<BatchDispatcher>,
}

/// Build the REST routes.
pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route("/api/campaigns", post(submit_campaign).get(list_campaigns))
        .route("/api/campaigns/{id}", get(get_campaign))
        .route("/api/campaigns/{id}/links", get(list_links))
        .route("/api/tenants/{id}/quota", get(get_quota))
        .route("/api/logs/{id}/open", post(record_open))
        .route("/l/{id}", get(click_redirect))
        .with_state(state)
}

// ── Campaign submission ─────────────────────────────────────────────

/// POST /api/campaigns request body. Exactly one of `recipients` or
/// `segment` must be present.
#[derive(Debug, Deserialize)]
struct SubmitCampaign {
    tenant_id: String,
    subject: String,
    html: String,
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    recipients: Option<Vec<String>>,
    #[serde(default)]
    segment: Option<String>,
    #[serde(default)]
    scheduled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    created_by: Option<String>,
}

/// POST /api/campaigns
///
/// A scheduled submission only persists the campaign; the sweep picks it
/// up at its due time. An immediate submission runs the dispatch pipeline
/// and returns the completion summary.
async fn submit_campaign(
    State(state): State<ApiState>,
    Json(body): Json<SubmitCampaign>,
) -> Response {
    let addressing = match (body.recipients, body.segment) {
        (Some(recipients), None) => Addressing::ExplicitList { recipients },
        (None, Some(name)) => Addressing::Segment { name },
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "error": "exactly one of 'recipients' or 'segment' is required"
                })),
            )
                .into_response();
        }
    };

    let mut campaign = Campaign::new(
        body.tenant_id,
        body.subject,
        body.html,
        addressing,
        body.scheduled_at,
    );
    if let Some(from) = body.from {
        campaign = campaign.with_from_address(from);
    }
    if let Some(who) = body.created_by {
        campaign = campaign.with_created_by(who);
    }

    if let Err(e) = state.store.insert_campaign(&campaign).await {
        return database_error(e);
    }

    if campaign.is_scheduled {
        return (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({
                "id": campaign.id,
                "scheduled": true,
                "scheduled_at": campaign.scheduled_at,
            })),
        )
            .into_response();
    }

    match state.dispatcher.dispatch(campaign.id).await {
        Ok(DispatchOutcome::Completed(summary)) => Json(summary).into_response(),
        Ok(DispatchOutcome::QuotaExceeded {
            limit,
            used,
            remaining,
            requested,
        }) => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({
                "error": "quota_exceeded",
                "limit": limit,
                "used": used,
                "remaining": remaining,
                "requested": requested,
            })),
        )
            .into_response(),
        Err(e) => dispatch_error(e),
    }
}

/// GET /api/campaigns/{id}
async fn get_campaign(State(state): State<ApiState>, Path(id): Path<Uuid>) -> Response {
    match state.store.get_campaign(id).await {
        Ok(Some(campaign)) => Json(campaign).into_response(),
        Ok(None) => not_found("campaign"),
        Err(e) => database_error(e),
    }
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    tenant: String,
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    50
}

/// GET /api/campaigns?tenant=...&limit=...
async fn list_campaigns(
    State(state): State<ApiState>,
    Query(query): Query<ListQuery>,
) -> Response {
    match state.store.list_campaigns(&query.tenant, query.limit).await {
        Ok(campaigns) => Json(campaigns).into_response(),
        Err(e) => database_error(e),
    }
}

/// GET /api/campaigns/{id}/links — the campaign's tracked links with
/// their click counts.
async fn list_links(State(state): State<ApiState>, Path(id): Path<Uuid>) -> Response {
    match state.store.list_links(id).await {
        Ok(links) => Json(links).into_response(),
        Err(e) => database_error(e),
    }
}

// ── Quota ───────────────────────────────────────────────────────────

/// GET /api/tenants/{id}/quota
async fn get_quota(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    match state.store.get_quota(&id, MessageType::Email).await {
        Ok(Some(account)) => Json(serde_json::json!({
            "tenant_id": account.tenant_id,
            "limit": account.limit,
            "used": account.used,
            "remaining": account.remaining(),
        }))
        .into_response(),
        Ok(None) => not_found("quota account"),
        Err(e) => database_error(e),
    }
}

// ── Tracking ────────────────────────────────────────────────────────

/// GET /l/{id} — click redirect.
///
/// Resolves a tracked link, counts the click and forwards to the original
/// href. Temporary redirect so clients keep coming back through here.
async fn click_redirect(State(state): State<ApiState>, Path(id): Path<Uuid>) -> Response {
    match state.store.record_click(id).await {
        Ok(Some(link)) => Redirect::temporary(&link.original_href).into_response(),
        Ok(None) => not_found("link"),
        Err(e) => database_error(e),
    }
}

/// POST /api/logs/{id}/open — open signal.
///
/// Transitions a delivered entry to `opened`; repeated opens are no-ops.
async fn record_open(State(state): State<ApiState>, Path(id): Path<Uuid>) -> Response {
    match state.store.mark_opened(id).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => database_error(e),
    }
}

// ── Error mapping ───────────────────────────────────────────────────

fn not_found(entity: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({"error": format!("{entity} not found")})),
    )
        .into_response()
}

fn database_error(e: DatabaseError) -> Response {
    error!(error = %e, "Storage error while serving request");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"error": "storage failure"})),
    )
        .into_response()
}

fn dispatch_error(e: DispatchError) -> Response {
    let (status, label) = match &e {
        DispatchError::CampaignNotFound(_) | DispatchError::TenantNotFound(_) => {
            (StatusCode::NOT_FOUND, "not_found")
        }
        DispatchError::Resolve(_) => (StatusCode::BAD_GATEWAY, "resolution_failed"),
        DispatchError::Consent(_) => (StatusCode::BAD_GATEWAY, "consent_check_failed"),
        DispatchError::Transport(_) => (StatusCode::BAD_GATEWAY, "transport_unavailable"),
        DispatchError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage failure"),
    };
    error!(error = %e, "Dispatch failed while serving request");
    (
        status,
        Json(serde_json::json!({"error": label, "detail": e.to_string()})),
    )
        .into_response()
}
