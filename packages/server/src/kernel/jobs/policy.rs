//! Retry/backoff policy.
//!
//! A pure function of the failure state: given the attempt counter before the
//! failing attempt and the error text, it decides whether the job goes back to
//! `pending` with a quadratic backoff or terminally `failed`.

use chrono::{DateTime, Duration, Utc};

use super::job::JobStatus;
use crate::kernel::audit::truncate_error;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Terminal threshold: the job fails once attempts reach this.
    pub max_attempts: u32,
    /// Base delay multiplied by attempts² for the next run.
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 30_000,
        }
    }
}

/// The state a failed job transitions to.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryOutcome {
    pub status: JobStatus,
    pub attempts: i32,
    pub next_run_at: Option<DateTime<Utc>>,
    pub last_error: String,
}

impl RetryPolicy {
    /// Backoff before attempt N+1, after N failed attempts: N² × base delay.
    pub fn backoff_delay(&self, attempts: u32) -> Duration {
        Duration::milliseconds((attempts as i64).pow(2) * self.base_delay_ms as i64)
    }

    /// Decide the next state after a transient failure.
    ///
    /// `attempts_before` is the counter as it stood when the attempt started;
    /// the outcome carries the incremented value.
    pub fn on_failure(
        &self,
        attempts_before: i32,
        error: &str,
        now: DateTime<Utc>,
    ) -> RetryOutcome {
        let attempts = attempts_before.saturating_add(1);
        let last_error = truncate_error(error);

        if attempts as u32 >= self.max_attempts {
            RetryOutcome {
                status: JobStatus::Failed,
                attempts,
                next_run_at: None,
                last_error,
            }
        } else {
            RetryOutcome {
                status: JobStatus::Pending,
                attempts,
                next_run_at: Some(now + self.backoff_delay(attempts as u32)),
                last_error,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::audit::MAX_ERROR_LEN;

    #[test]
    fn backoff_widens_quadratically() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_delay(1), Duration::milliseconds(30_000));
        assert_eq!(policy.backoff_delay(2), Duration::milliseconds(120_000));
        assert_eq!(policy.backoff_delay(3), Duration::milliseconds(270_000));
        assert_eq!(policy.backoff_delay(4), Duration::milliseconds(480_000));
    }

    #[test]
    fn failure_below_threshold_reschedules() {
        let policy = RetryPolicy::default();
        let now = Utc::now();

        let outcome = policy.on_failure(0, "timeout", now);
        assert_eq!(outcome.status, JobStatus::Pending);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.next_run_at, Some(now + Duration::seconds(30)));
        assert_eq!(outcome.last_error, "timeout");

        let outcome = policy.on_failure(3, "timeout", now);
        assert_eq!(outcome.attempts, 4);
        assert_eq!(outcome.next_run_at, Some(now + Duration::seconds(480)));
    }

    #[test]
    fn fifth_failure_is_terminal() {
        let policy = RetryPolicy::default();
        let outcome = policy.on_failure(4, "still broken", Utc::now());
        assert_eq!(outcome.status, JobStatus::Failed);
        assert_eq!(outcome.attempts, 5);
        assert_eq!(outcome.next_run_at, None);
        assert_eq!(outcome.last_error, "still broken");
    }

    #[test]
    fn attempts_past_threshold_stay_terminal() {
        let policy = RetryPolicy::default();
        let outcome = policy.on_failure(7, "boom", Utc::now());
        assert_eq!(outcome.status, JobStatus::Failed);
        assert_eq!(outcome.next_run_at, None);
    }

    #[test]
    fn custom_threshold_is_honored() {
        let policy = RetryPolicy {
            max_attempts: 2,
            base_delay_ms: 1_000,
        };
        let now = Utc::now();
        let first = policy.on_failure(0, "e", now);
        assert_eq!(first.status, JobStatus::Pending);
        assert_eq!(first.next_run_at, Some(now + Duration::seconds(1)));
        let second = policy.on_failure(1, "e", now);
        assert_eq!(second.status, JobStatus::Failed);
    }

    #[test]
    fn error_text_is_truncated() {
        let policy = RetryPolicy::default();
        let long = "e".repeat(MAX_ERROR_LEN * 2);
        let outcome = policy.on_failure(0, &long, Utc::now());
        assert_eq!(outcome.last_error.chars().count(), MAX_ERROR_LEN);
    }
}
