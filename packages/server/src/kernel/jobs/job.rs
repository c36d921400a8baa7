//! Job model for queued outbound communications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "automation_job_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    Processing,
    Sent,
    Failed,
}

impl JobStatus {
    /// Terminal states are never re-claimed except through an explicit reset.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Sent | JobStatus::Failed)
    }
}

#[derive(FromRow, Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,

    pub status: JobStatus,

    // Origin bookkeeping from the enqueueing trigger
    pub event_table: Option<String>,
    pub event_type: Option<String>,

    /// Raw send payload: action, recipient, message fields. Validated at
    /// enqueue time; resolved again at dispatch because rows may be inserted
    /// by external event triggers.
    pub payload: Value,

    /// Transient-failure counter. Non-retryable failures do not touch it.
    pub attempts: i32,

    /// Due time; `None` once the job is terminal.
    pub next_run_at: Option<DateTime<Utc>>,

    pub last_error: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a pending job due immediately.
    pub fn pending(payload: Value) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            status: JobStatus::Pending,
            event_table: None,
            event_type: None,
            payload,
            attempts: 0,
            next_run_at: Some(now),
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_event(mut self, event_table: Option<String>, event_type: Option<String>) -> Self {
        self.event_table = event_table;
        self.event_type = event_type;
        self
    }

    /// Whether the job is eligible for dispatch at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == JobStatus::Pending
            && self.next_run_at.map(|t| t <= now).unwrap_or(false)
    }
}
