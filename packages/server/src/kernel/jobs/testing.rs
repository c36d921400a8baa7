//! In-memory doubles for exercising queue and dispatch logic without a
//! database or live provider credentials.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use super::job::{Job, JobStatus};
use super::payload::{Channel, SendRequest};
use super::policy::RetryOutcome;
use super::store::JobStore;
use crate::kernel::audit::{AuditWriter, NewCommunicationLog};
use crate::kernel::providers::{ProviderAdapter, SendError, SendOutcome};

/// Map-backed job store. The claim runs compare-and-set under one lock, so it
/// has the same winner-takes-it semantics as the conditional SQL update.
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: Mutex<HashMap<Uuid, Job>>,
    ops: AtomicUsize,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of one record, for assertions.
    pub fn get(&self, id: Uuid) -> Option<Job> {
        self.jobs.lock().unwrap().get(&id).cloned()
    }

    pub fn job_count(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    /// Number of store operations performed, for asserting that rejected
    /// requests never touched the queue.
    pub fn op_count(&self) -> usize {
        self.ops.load(Ordering::SeqCst)
    }

    /// Pull a pending record's due time back to now, collapsing its backoff.
    pub fn force_due(&self, id: Uuid) {
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(job) = jobs.get_mut(&id) {
            if job.status == JobStatus::Pending {
                job.next_run_at = Some(Utc::now());
            }
        }
    }

    fn record_op(&self) {
        self.ops.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn insert(&self, job: Job) -> Result<Job> {
        self.record_op();
        self.jobs.lock().unwrap().insert(job.id, job.clone());
        Ok(job)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Job>> {
        self.record_op();
        Ok(self.get(id))
    }

    async fn fetch_due(&self, limit: i64) -> Result<Vec<Job>> {
        self.record_op();
        let now = Utc::now();
        let mut due: Vec<Job> = self
            .jobs
            .lock()
            .unwrap()
            .values()
            .filter(|job| job.is_due(now))
            .cloned()
            .collect();
        due.sort_by_key(|job| job.next_run_at);
        due.truncate(limit.max(0) as usize);
        Ok(due)
    }

    async fn claim(&self, id: Uuid) -> Result<Option<Job>> {
        self.record_op();
        let mut jobs = self.jobs.lock().unwrap();
        match jobs.get_mut(&id) {
            Some(job) if job.status == JobStatus::Pending => {
                job.status = JobStatus::Processing;
                job.updated_at = Utc::now();
                Ok(Some(job.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn mark_sent(&self, id: Uuid) -> Result<()> {
        self.record_op();
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(job) = jobs.get_mut(&id) {
            job.status = JobStatus::Sent;
            job.last_error = None;
            job.next_run_at = None;
            job.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn apply_retry(&self, id: Uuid, outcome: &RetryOutcome) -> Result<()> {
        self.record_op();
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(job) = jobs.get_mut(&id) {
            job.status = outcome.status;
            job.attempts = outcome.attempts;
            job.next_run_at = outcome.next_run_at;
            job.last_error = Some(outcome.last_error.clone());
            job.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<()> {
        self.record_op();
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(job) = jobs.get_mut(&id) {
            job.status = JobStatus::Failed;
            job.last_error = Some(error.to_string());
            job.next_run_at = None;
            job.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn reset(&self, id: Uuid) -> Result<Option<Job>> {
        self.record_op();
        let mut jobs = self.jobs.lock().unwrap();
        match jobs.get_mut(&id) {
            Some(job) => {
                job.status = JobStatus::Pending;
                job.attempts = 0;
                job.next_run_at = Some(Utc::now());
                job.last_error = None;
                job.updated_at = Utc::now();
                Ok(Some(job.clone()))
            }
            None => Ok(None),
        }
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Collecting audit writer.
#[derive(Default)]
pub struct InMemoryAuditWriter {
    log: Mutex<Vec<NewCommunicationLog>>,
}

impl InMemoryAuditWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<NewCommunicationLog> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditWriter for InMemoryAuditWriter {
    async fn append(&self, entry: NewCommunicationLog) -> Result<()> {
        self.log.lock().unwrap().push(entry);
        Ok(())
    }
}

/// What the stub adapter returns on every call.
#[derive(Debug, Clone)]
pub enum StubOutcome {
    Success,
    Transient(String),
    Validation(String),
    Config(String),
}

/// Scripted provider adapter: fixed channel, fixed outcome, call counting,
/// optional per-call latency for timeout tests.
pub struct StubAdapter {
    channel: Channel,
    outcome: StubOutcome,
    latency: Option<Duration>,
    calls: AtomicUsize,
}

impl StubAdapter {
    pub fn new(channel: Channel, outcome: StubOutcome) -> Self {
        Self {
            channel,
            outcome,
            latency: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// A successful adapter that sleeps before answering.
    pub fn slow(channel: Channel, latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::new(channel, StubOutcome::Success)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderAdapter for StubAdapter {
    fn channel(&self) -> Channel {
        self.channel
    }

    async fn send(&self, request: &SendRequest) -> Result<SendOutcome, SendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        match &self.outcome {
            StubOutcome::Success => Ok(SendOutcome {
                provider_id: Some("stub-1".to_string()),
                raw_response: json!({ "ok": true, "to": request.to }),
            }),
            StubOutcome::Transient(message) => Err(SendError::Transient(message.clone())),
            StubOutcome::Validation(message) => Err(SendError::Validation(message.clone())),
            StubOutcome::Config(message) => Err(SendError::Config(message.clone())),
        }
    }
}
