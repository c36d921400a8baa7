//! Automation endpoints: trigger a dispatch cycle, retry a failed job,
//! enqueue a job from an external event, and admin manual sends.

use axum::extract::Extension;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::kernel::{resolve_payload, Channel, CycleOutcome, Job, JobStore, SendRequest};
use crate::server::app::AppState;
use crate::server::error::ApiError;
use crate::server::middleware::{verify_shared_secret, AuthUser};

#[derive(Debug, Deserialize)]
pub struct TriggerRequest {
    /// Override for this cycle, capped at the configured batch limit.
    pub limit: Option<i64>,
}

/// POST /automation/trigger - run one dispatch cycle over due jobs.
///
/// Guarded by the shared secret; intended for cron schedulers and operators.
/// Safe to call concurrently: overlapping cycles coordinate through the
/// per-job claim.
pub async fn trigger_handler(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    body: Option<Json<TriggerRequest>>,
) -> Result<Json<CycleOutcome>, ApiError> {
    verify_shared_secret(state.automation_secret.as_deref(), &headers)?;

    let limit = body
        .and_then(|Json(request)| request.limit)
        .unwrap_or(state.batch_limit)
        .clamp(1, state.batch_limit);

    let outcome = state.dispatcher.run_cycle(limit).await?;
    info!(processed = outcome.processed, "dispatch cycle complete");

    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct RetryRequest {
    pub job_id: Uuid,
}

#[derive(Serialize)]
pub struct RetryResponse {
    pub ok: bool,
    pub job: Job,
}

/// POST /automation/retry - re-queue a job for immediate dispatch.
///
/// Resets status, attempts and error regardless of current state, so a
/// terminally failed job gets a fresh retry budget. Idempotent.
pub async fn retry_handler(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    Json(request): Json<RetryRequest>,
) -> Result<Json<RetryResponse>, ApiError> {
    verify_shared_secret(state.automation_secret.as_deref(), &headers)?;

    let job = state
        .store
        .reset(request.job_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no job with id {}", request.job_id)))?;

    info!(job_id = %job.id, "job reset for retry");

    Ok(Json(RetryResponse { ok: true, job }))
}

#[derive(Debug, Deserialize)]
pub struct EnqueueRequest {
    /// Source table of the originating event.
    pub event_table: String,
    pub event_type: Option<String>,
    /// Raw send payload; must resolve to a supported action and recipient.
    pub event_payload: Value,
}

#[derive(Serialize)]
pub struct EnqueueResponse {
    pub success: bool,
    pub inserted: Job,
}

/// POST /automation/enqueue - insert a pending job from an external event.
///
/// The payload is validated up front so callers learn about malformed events
/// immediately instead of via a dead job on the queue.
pub async fn enqueue_handler(
    Extension(state): Extension<AppState>,
    Json(request): Json<EnqueueRequest>,
) -> Result<Json<EnqueueResponse>, ApiError> {
    resolve_payload(&request.event_payload)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let job = Job::pending(request.event_payload)
        .with_event(Some(request.event_table), request.event_type);
    let inserted = state.store.insert(job).await?;

    info!(
        job_id = %inserted.id,
        event_table = inserted.event_table.as_deref().unwrap_or("-"),
        "job enqueued"
    );

    Ok(Json(EnqueueResponse {
        success: true,
        inserted,
    }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendMode {
    /// Insert pending jobs; the next dispatch cycle sends them with the full
    /// retry machinery.
    Enqueue,
    /// Send immediately and report per-recipient results.
    Direct,
}

#[derive(Debug, Deserialize)]
pub struct ManualSendRequest {
    pub mode: SendMode,
    pub channel: Channel,
    pub recipients: Vec<String>,
    pub subject: Option<String>,
    #[serde(default)]
    pub body: String,
    pub template_id: Option<String>,
    pub template_params: Option<Value>,
}

#[derive(Serialize)]
pub struct RecipientResult {
    pub recipient: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct ManualSendResponse {
    pub success: bool,
    pub results: Vec<RecipientResult>,
}

/// POST /automation/manual-send - admin-initiated batch send.
///
/// Requires an admin JWT. One recipient failing never aborts the rest of the
/// batch; each recipient gets its own result entry.
pub async fn manual_send_handler(
    Extension(state): Extension<AppState>,
    auth_user: Option<Extension<AuthUser>>,
    Json(request): Json<ManualSendRequest>,
) -> Result<Json<ManualSendResponse>, ApiError> {
    let Some(Extension(user)) = auth_user else {
        return Err(ApiError::Unauthorized);
    };
    if !user.is_admin {
        return Err(ApiError::Forbidden);
    }

    if request.recipients.is_empty() {
        return Err(ApiError::BadRequest("recipients must not be empty".into()));
    }

    info!(
        account_id = %user.account_id,
        channel = %request.channel,
        recipients = request.recipients.len(),
        mode = ?request.mode,
        "manual send requested"
    );

    let mut results = Vec::with_capacity(request.recipients.len());
    for recipient in &request.recipients {
        let result = match request.mode {
            SendMode::Direct => {
                let send = SendRequest {
                    channel: request.channel,
                    to: recipient.clone(),
                    subject: request.subject.clone(),
                    body: request.body.clone(),
                    template_id: request.template_id.clone(),
                    template_params: request.template_params.clone(),
                };
                match state.dispatcher.dispatch_direct(&send).await {
                    Ok(outcome) => RecipientResult {
                        recipient: recipient.clone(),
                        ok: true,
                        job_id: None,
                        provider_id: outcome.provider_id,
                        error: None,
                    },
                    Err(e) => RecipientResult {
                        recipient: recipient.clone(),
                        ok: false,
                        job_id: None,
                        provider_id: None,
                        error: Some(e.to_string()),
                    },
                }
            }
            SendMode::Enqueue => {
                let payload = manual_payload(&request, recipient);
                match state.store.insert(Job::pending(payload)).await {
                    Ok(job) => RecipientResult {
                        recipient: recipient.clone(),
                        ok: true,
                        job_id: Some(job.id),
                        provider_id: None,
                        error: None,
                    },
                    Err(e) => RecipientResult {
                        recipient: recipient.clone(),
                        ok: false,
                        job_id: None,
                        provider_id: None,
                        error: Some(e.to_string()),
                    },
                }
            }
        };
        results.push(result);
    }

    Ok(Json(ManualSendResponse {
        success: true,
        results,
    }))
}

/// Queue payload for one recipient of a manual batch, in the same shape the
/// event triggers produce.
fn manual_payload(request: &ManualSendRequest, recipient: &str) -> Value {
    let mut payload = serde_json::Map::new();
    payload.insert(
        "action".to_string(),
        Value::String(request.channel.action().to_string()),
    );
    payload.insert("to".to_string(), Value::String(recipient.to_string()));
    payload.insert("body".to_string(), Value::String(request.body.clone()));
    if let Some(subject) = &request.subject {
        payload.insert("subject".to_string(), Value::String(subject.clone()));
    }
    if let Some(template_id) = &request.template_id {
        payload.insert(
            "template_id".to_string(),
            Value::String(template_id.clone()),
        );
    }
    if let Some(params) = &request.template_params {
        payload.insert("template_params".to_string(), params.clone());
    }
    Value::Object(payload)
}
