//! Job record store: durable queue state, queryable by status and due time.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::job::Job;
use super::policy::RetryOutcome;

/// Storage for queue state.
///
/// `claim` is the concurrency primitive of the whole subsystem: it must
/// atomically transition `pending → processing` and report whether this
/// caller won, so overlapping dispatcher invocations never process the same
/// job twice.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new record as given.
    async fn insert(&self, job: Job) -> Result<Job>;

    async fn find(&self, id: Uuid) -> Result<Option<Job>>;

    /// Up to `limit` pending records due at or before now, oldest-due first
    /// (prevents starvation). No side effects.
    async fn fetch_due(&self, limit: i64) -> Result<Vec<Job>>;

    /// Atomically claim a pending record. Returns `None` when another worker
    /// already took it; that is not an error.
    async fn claim(&self, id: Uuid) -> Result<Option<Job>>;

    /// Terminal success: clears `last_error` and the due time.
    async fn mark_sent(&self, id: Uuid) -> Result<()>;

    /// Apply a retry-policy outcome: reschedule or terminally fail, with the
    /// incremented attempt counter.
    async fn apply_retry(&self, id: Uuid, outcome: &RetryOutcome) -> Result<()>;

    /// Terminal failure that bypasses the retry policy (unsupported action,
    /// validation or configuration error). `attempts` is left untouched.
    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<()>;

    /// Re-queue a record: pending, zero attempts, due now, error cleared.
    /// Idempotent; returns the updated record or `None` when unknown.
    async fn reset(&self, id: Uuid) -> Result<Option<Job>>;

    /// Connectivity probe for health checks.
    async fn ping(&self) -> Result<()>;
}

const JOB_COLUMNS: &str = "id, status, event_table, event_type, payload, attempts, \
                           next_run_at, last_error, created_at, updated_at";

/// PostgreSQL-backed job store.
pub struct PostgresJobStore {
    pool: PgPool,
}

impl PostgresJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PostgresJobStore {
    async fn insert(&self, job: Job) -> Result<Job> {
        let inserted = sqlx::query_as::<_, Job>(&format!(
            r#"
            INSERT INTO automation_jobs
                ({JOB_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {JOB_COLUMNS}
            "#,
        ))
        .bind(job.id)
        .bind(job.status)
        .bind(&job.event_table)
        .bind(&job.event_type)
        .bind(&job.payload)
        .bind(job.attempts)
        .bind(job.next_run_at)
        .bind(&job.last_error)
        .bind(job.created_at)
        .bind(job.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(inserted)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Job>> {
        let job = sqlx::query_as::<_, Job>(&format!(
            "SELECT {JOB_COLUMNS} FROM automation_jobs WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(job)
    }

    async fn fetch_due(&self, limit: i64) -> Result<Vec<Job>> {
        let jobs = sqlx::query_as::<_, Job>(&format!(
            r#"
            SELECT {JOB_COLUMNS}
            FROM automation_jobs
            WHERE status = 'pending'
              AND next_run_at <= NOW()
            ORDER BY next_run_at ASC
            LIMIT $1
            "#,
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(jobs)
    }

    async fn claim(&self, id: Uuid) -> Result<Option<Job>> {
        // Conditional single-row update; the RETURNING row is the proof the
        // claim succeeded. No row means another worker won.
        let claimed = sqlx::query_as::<_, Job>(&format!(
            r#"
            UPDATE automation_jobs
            SET status = 'processing',
                updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING {JOB_COLUMNS}
            "#,
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(claimed)
    }

    async fn mark_sent(&self, id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE automation_jobs
            SET status = 'sent',
                last_error = NULL,
                next_run_at = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn apply_retry(&self, id: Uuid, outcome: &RetryOutcome) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE automation_jobs
            SET status = $2,
                attempts = $3,
                next_run_at = $4,
                last_error = $5,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(outcome.status)
        .bind(outcome.attempts)
        .bind(outcome.next_run_at)
        .bind(&outcome.last_error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE automation_jobs
            SET status = 'failed',
                last_error = $2,
                next_run_at = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn reset(&self, id: Uuid) -> Result<Option<Job>> {
        let job = sqlx::query_as::<_, Job>(&format!(
            r#"
            UPDATE automation_jobs
            SET status = 'pending',
                attempts = 0,
                next_run_at = NOW(),
                last_error = NULL,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {JOB_COLUMNS}
            "#,
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(job)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
