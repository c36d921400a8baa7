//! Dispatcher: one polling cycle over the job queue.
//!
//! The dispatcher is stateless between invocations; overlapping cycles from
//! concurrent triggers coordinate solely through the store's atomic claim.
//! Every claimed job produces exactly one communication-log entry, success or
//! failure, and one job failure never aborts the rest of the batch.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, error, warn};

use super::job::Job;
use super::payload::{resolve_payload, PayloadError, SendRequest};
use super::policy::RetryPolicy;
use super::store::JobStore;
use crate::kernel::audit::{truncate_error, AuditWriter, LogStatus, NewCommunicationLog};
use crate::kernel::providers::{ProviderRegistry, SendError, SendOutcome};

/// Result of one dispatch cycle.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CycleOutcome {
    /// Jobs sent successfully this cycle. Claim conflicts and failures are
    /// not counted; they surface through job rows and the communication log.
    pub processed: usize,
}

pub struct Dispatcher {
    store: Arc<dyn JobStore>,
    providers: ProviderRegistry,
    audit: Arc<dyn AuditWriter>,
    policy: RetryPolicy,
    /// Upper bound on one provider call; a timeout is a transient failure.
    send_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn JobStore>,
        providers: ProviderRegistry,
        audit: Arc<dyn AuditWriter>,
        policy: RetryPolicy,
        send_timeout: Duration,
    ) -> Self {
        Self {
            store,
            providers,
            audit,
            policy,
            send_timeout,
        }
    }

    /// Run one polling cycle over up to `limit` due jobs.
    ///
    /// Returns `Err` only when the due-job fetch itself fails; per-job errors
    /// are logged and isolated. Jobs whose claim is lost or errors are skipped
    /// and stay eligible for the next cycle.
    pub async fn run_cycle(&self, limit: i64) -> Result<CycleOutcome> {
        let due = self
            .store
            .fetch_due(limit)
            .await
            .context("failed to fetch due jobs")?;

        if due.is_empty() {
            return Ok(CycleOutcome::default());
        }

        debug!(count = due.len(), "fetched due jobs");

        let mut processed = 0;
        for job in due {
            let claimed = match self.store.claim(job.id).await {
                Ok(Some(job)) => job,
                Ok(None) => {
                    debug!(job_id = %job.id, "claim lost to another worker, skipping");
                    continue;
                }
                Err(e) => {
                    // Claim never succeeded, the job stays pending for the
                    // next cycle.
                    error!(job_id = %job.id, error = %e, "claim failed, skipping");
                    continue;
                }
            };

            if self.process_claimed(&claimed).await {
                processed += 1;
            }
        }

        Ok(CycleOutcome { processed })
    }

    /// Send directly, bypassing the queue (manual admin sends). Still writes
    /// one communication-log entry per attempt.
    pub async fn dispatch_direct(
        &self,
        request: &SendRequest,
    ) -> Result<SendOutcome, SendError> {
        let result = self.attempt_send(request).await;
        match &result {
            Ok(outcome) => {
                self.append_log(Self::sent_entry(request, outcome)).await;
            }
            Err(e) => {
                self.append_log(Self::failed_entry(
                    request.channel.as_str(),
                    Some(request),
                    &e.to_string(),
                ))
                .await;
            }
        }
        result
    }

    /// Process one claimed job; returns whether it was sent.
    async fn process_claimed(&self, job: &Job) -> bool {
        let request = match resolve_payload(&job.payload) {
            Ok(request) => request,
            Err(PayloadError::UnsupportedAction(action)) => {
                let message = format!("unsupported action {action}");
                self.fail_terminal(job, &action, None, &message).await;
                return false;
            }
            Err(e) => {
                self.fail_terminal(job, "unknown", None, &e.to_string()).await;
                return false;
            }
        };

        match self.attempt_send(&request).await {
            Ok(outcome) => {
                debug!(job_id = %job.id, channel = %request.channel, "job sent");
                if let Err(e) = self.store.mark_sent(job.id).await {
                    error!(job_id = %job.id, error = %e, "failed to mark job as sent");
                }
                self.append_log(Self::sent_entry(&request, &outcome)).await;
                true
            }
            Err(SendError::Transient(message)) => {
                let outcome = self.policy.on_failure(job.attempts, &message, Utc::now());
                warn!(
                    job_id = %job.id,
                    channel = %request.channel,
                    attempts = outcome.attempts,
                    retrying = outcome.next_run_at.is_some(),
                    error = %message,
                    "send failed"
                );
                if let Err(e) = self.store.apply_retry(job.id, &outcome).await {
                    error!(job_id = %job.id, error = %e, "failed to reschedule job");
                }
                self.append_log(Self::failed_entry(
                    request.channel.as_str(),
                    Some(&request),
                    &message,
                ))
                .await;
                false
            }
            Err(e @ (SendError::Config(_) | SendError::Validation(_))) => {
                self.fail_terminal(job, request.channel.as_str(), Some(&request), &e.to_string())
                    .await;
                false
            }
        }
    }

    /// Terminal failure outside the retry policy; `attempts` stays as-is.
    async fn fail_terminal(
        &self,
        job: &Job,
        channel: &str,
        request: Option<&SendRequest>,
        message: &str,
    ) {
        warn!(job_id = %job.id, error = %message, "job failed terminally");
        if let Err(e) = self.store.mark_failed(job.id, &truncate_error(message)).await {
            error!(job_id = %job.id, error = %e, "failed to mark job as failed");
        }
        self.append_log(Self::failed_entry(channel, request, message))
            .await;
    }

    async fn attempt_send(&self, request: &SendRequest) -> Result<SendOutcome, SendError> {
        let adapter = self.providers.resolve(request.channel)?;
        match tokio::time::timeout(self.send_timeout, adapter.send(request)).await {
            Ok(result) => result,
            Err(_) => Err(SendError::Transient(format!(
                "provider call timed out after {}s",
                self.send_timeout.as_secs()
            ))),
        }
    }

    fn sent_entry(request: &SendRequest, outcome: &SendOutcome) -> NewCommunicationLog {
        NewCommunicationLog {
            channel: request.channel.as_str().to_string(),
            recipient: Some(request.to.clone()),
            subject: request.subject.clone(),
            message: Some(request.body.clone()),
            status: LogStatus::Sent,
            provider_response: outcome.raw_response.clone(),
        }
    }

    fn failed_entry(
        channel: &str,
        request: Option<&SendRequest>,
        error: &str,
    ) -> NewCommunicationLog {
        NewCommunicationLog {
            channel: channel.to_string(),
            recipient: request.map(|r| r.to.clone()),
            subject: request.and_then(|r| r.subject.clone()),
            message: request.map(|r| r.body.clone()),
            status: LogStatus::Failed,
            provider_response: json!({ "error": truncate_error(error) }),
        }
    }

    /// Audit failures must not fail the attempt; log and continue.
    async fn append_log(&self, entry: NewCommunicationLog) {
        if let Err(e) = self.audit.append(entry).await {
            error!(error = %e, "failed to append communication log entry");
        }
    }
}
