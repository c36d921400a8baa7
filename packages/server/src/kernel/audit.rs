//! Append-only communication log.
//!
//! Every dispatch attempt (queued or direct, success or failure) produces
//! exactly one entry here. Entries are never updated or deleted; reporting
//! and export tooling read them elsewhere.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Persisted budget for error/response text.
pub const MAX_ERROR_LEN: usize = 1000;

/// Truncate an error message to the persisted budget.
///
/// Counts characters, not bytes, so multibyte provider responses cannot be
/// split mid-codepoint.
pub fn truncate_error(error: &str) -> String {
    error.chars().take(MAX_ERROR_LEN).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "communication_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LogStatus {
    Sent,
    Failed,
}

/// One row of the communication log.
#[derive(FromRow, Debug, Clone, Serialize)]
pub struct CommunicationLog {
    pub id: Uuid,
    /// Channel name, or the raw action string for unsupported actions.
    pub channel: String,
    pub recipient: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
    pub status: LogStatus,
    pub provider_response: Value,
    pub sent_at: DateTime<Utc>,
}

/// Entry pending insertion; `id` and `sent_at` are assigned by the writer.
#[derive(Debug, Clone)]
pub struct NewCommunicationLog {
    pub channel: String,
    pub recipient: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
    pub status: LogStatus,
    pub provider_response: Value,
}

#[async_trait]
pub trait AuditWriter: Send + Sync {
    /// Append one immutable entry. Called exactly once per dispatch attempt.
    async fn append(&self, entry: NewCommunicationLog) -> Result<()>;
}

/// PostgreSQL-backed audit writer. Insert-only by construction.
pub struct PostgresAuditWriter {
    pool: PgPool,
}

impl PostgresAuditWriter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditWriter for PostgresAuditWriter {
    async fn append(&self, entry: NewCommunicationLog) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO communication_logs
                (id, channel, recipient, subject, message, status, provider_response, sent_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&entry.channel)
        .bind(&entry.recipient)
        .bind(&entry.subject)
        .bind(&entry.message)
        .bind(entry.status)
        .bind(&entry.provider_response)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
