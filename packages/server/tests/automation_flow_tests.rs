//! End-to-end queue flows over the production router: enqueue, dispatch,
//! retry with backoff, and operator reset.

mod common;

use std::sync::Arc;

use automation_core::kernel::jobs::testing::{StubAdapter, StubOutcome};
use automation_core::kernel::{Channel, Job, JobStatus, JobStore, ProviderRegistry, RetryPolicy};
use axum::http::StatusCode;
use common::TestHarness;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn enqueued_job_is_sent_on_the_next_trigger() {
    let harness = TestHarness::new();

    let (status, body) = harness
        .post_json(
            "/automation/enqueue",
            &[],
            Some(json!({
                "event_table": "orders",
                "event_type": "insert",
                "event_payload": {
                    "action": "send_email",
                    "to": "customer@example.com",
                    "subject": "Order received",
                    "body": "Thanks for your order"
                }
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let job_id: Uuid = serde_json::from_value(body["inserted"]["id"].clone()).unwrap();
    assert_eq!(body["inserted"]["status"], "pending");
    assert_eq!(body["inserted"]["attempts"], 0);

    let (status, body) = harness.post_json("/automation/trigger", &[], None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["processed"], 1);

    let job = harness.store.get(job_id).unwrap();
    assert_eq!(job.status, JobStatus::Sent);
    assert!(job.last_error.is_none());

    // Exactly one audit entry for the successful send.
    let entries = harness.audit.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].channel, "email");
    assert_eq!(entries[0].recipient.as_deref(), Some("customer@example.com"));
}

#[tokio::test]
async fn enqueue_rejects_malformed_payload_without_inserting() {
    let harness = TestHarness::new();

    let (status, body) = harness
        .post_json(
            "/automation/enqueue",
            &[],
            Some(json!({
                "event_table": "orders",
                "event_payload": { "action": "fax", "to": "555" }
            })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "unsupported action fax");
    assert_eq!(harness.store.job_count(), 0);
}

#[tokio::test]
async fn enqueue_rejects_missing_recipient() {
    let harness = TestHarness::new();

    let (status, body) = harness
        .post_json(
            "/automation/enqueue",
            &[],
            Some(json!({
                "event_table": "orders",
                "event_payload": { "action": "send_email", "body": "hello" }
            })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("no recipient"));
}

#[tokio::test]
async fn failing_job_retries_until_the_attempt_ceiling() {
    let providers = ProviderRegistry::new().with_email(Arc::new(StubAdapter::new(
        Channel::Email,
        StubOutcome::Transient("smtp 503".into()),
    )));
    let harness = TestHarness::builder().with_providers(providers).build();

    let job = harness
        .store
        .insert(Job::pending(json!({
            "action": "send_email",
            "to": "customer@example.com",
            "body": "hi"
        })))
        .await
        .unwrap();

    for attempt in 1..=5 {
        harness.store.force_due(job.id);
        let (status, body) = harness.post_json("/automation/trigger", &[], None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["processed"], 0);

        let stored = harness.store.get(job.id).unwrap();
        assert_eq!(stored.attempts, attempt);
        if attempt < 5 {
            assert_eq!(stored.status, JobStatus::Pending);
            assert!(stored.next_run_at.is_some());
        } else {
            assert_eq!(stored.status, JobStatus::Failed);
            assert!(stored.next_run_at.is_none());
        }
        assert_eq!(stored.last_error.as_deref(), Some("smtp 503"));
    }

    // One audit entry per attempt.
    assert_eq!(harness.audit.entries().len(), 5);
}

#[tokio::test]
async fn rescheduled_job_is_not_picked_up_before_its_backoff_elapses() {
    let providers = ProviderRegistry::new().with_email(Arc::new(StubAdapter::new(
        Channel::Email,
        StubOutcome::Transient("smtp 503".into()),
    )));
    let harness = TestHarness::builder().with_providers(providers).build();

    let job = harness
        .store
        .insert(Job::pending(json!({
            "action": "send_email",
            "to": "customer@example.com",
            "body": "hi"
        })))
        .await
        .unwrap();

    harness.post_json("/automation/trigger", &[], None).await;
    assert_eq!(harness.store.get(job.id).unwrap().attempts, 1);

    // The job is now 30s in the future; an immediate second cycle skips it.
    harness.post_json("/automation/trigger", &[], None).await;
    assert_eq!(harness.store.get(job.id).unwrap().attempts, 1);
    assert_eq!(harness.audit.entries().len(), 1);
}

#[tokio::test]
async fn reset_gives_a_failed_job_a_fresh_retry_budget() {
    let harness = TestHarness::new();

    let mut failed = Job::pending(json!({
        "action": "send_email",
        "to": "customer@example.com",
        "body": "hi"
    }));
    failed.status = JobStatus::Failed;
    failed.attempts = 5;
    failed.next_run_at = None;
    failed.last_error = Some("smtp 503".to_string());
    let failed = harness.store.insert(failed).await.unwrap();

    let (status, body) = harness
        .post_json(
            "/automation/retry",
            &[],
            Some(json!({ "job_id": failed.id })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["job"]["status"], "pending");
    assert_eq!(body["job"]["attempts"], 0);
    assert!(body["job"]["last_error"].is_null());

    // The reset job goes out on the next cycle.
    let (_, body) = harness.post_json("/automation/trigger", &[], None).await;
    assert_eq!(body["processed"], 1);
    assert_eq!(harness.store.get(failed.id).unwrap().status, JobStatus::Sent);
}

#[tokio::test]
async fn reset_of_a_pending_job_is_idempotent() {
    let harness = TestHarness::new();

    let job = harness
        .store
        .insert(Job::pending(json!({
            "action": "send_email",
            "to": "customer@example.com",
            "body": "hi"
        })))
        .await
        .unwrap();

    // Resetting an already-pending job is safe to call repeatedly.
    for _ in 0..2 {
        let (status, body) = harness
            .post_json("/automation/retry", &[], Some(json!({ "job_id": job.id })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["job"]["status"], "pending");
        assert_eq!(body["job"]["attempts"], 0);
    }

    let stored = harness.store.get(job.id).unwrap();
    assert_eq!(stored.status, JobStatus::Pending);
    assert_eq!(stored.attempts, 0);
    assert!(stored.last_error.is_none());
}

#[tokio::test]
async fn unsupported_action_inserted_by_an_external_writer_fails_terminally() {
    // External event triggers can insert rows this service never validated.
    let harness = TestHarness::new();

    let job = harness
        .store
        .insert(Job::pending(json!({ "action": "fax", "to": "555" })))
        .await
        .unwrap();

    let (_, body) = harness.post_json("/automation/trigger", &[], None).await;
    assert_eq!(body["processed"], 0);

    let stored = harness.store.get(job.id).unwrap();
    assert_eq!(stored.status, JobStatus::Failed);
    assert_eq!(stored.attempts, 0);
    assert!(stored
        .last_error
        .as_deref()
        .unwrap()
        .contains("unsupported action fax"));

    let entries = harness.audit.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].channel, "fax");
}

#[tokio::test]
async fn trigger_limit_caps_the_cycle() {
    let harness = TestHarness::new();

    for _ in 0..5 {
        harness
            .store
            .insert(Job::pending(json!({
                "action": "send_email",
                "to": "customer@example.com",
                "body": "hi"
            })))
            .await
            .unwrap();
    }

    let (_, body) = harness
        .post_json("/automation/trigger", &[], Some(json!({ "limit": 2 })))
        .await;
    assert_eq!(body["processed"], 2);

    // A limit beyond the configured batch cap is clamped, not honored.
    let (_, body) = harness
        .post_json("/automation/trigger", &[], Some(json!({ "limit": 10_000 })))
        .await;
    assert_eq!(body["processed"], 3);
}

#[tokio::test]
async fn custom_retry_policy_flows_through_the_stack() {
    let providers = ProviderRegistry::new().with_email(Arc::new(StubAdapter::new(
        Channel::Email,
        StubOutcome::Transient("boom".into()),
    )));
    let harness = TestHarness::builder()
        .with_providers(providers)
        .with_policy(RetryPolicy {
            max_attempts: 2,
            base_delay_ms: 1_000,
        })
        .build();

    let job = harness
        .store
        .insert(Job::pending(json!({
            "action": "send_email",
            "to": "customer@example.com",
            "body": "hi"
        })))
        .await
        .unwrap();

    harness.post_json("/automation/trigger", &[], None).await;
    harness.store.force_due(job.id);
    harness.post_json("/automation/trigger", &[], None).await;

    let stored = harness.store.get(job.id).unwrap();
    assert_eq!(stored.status, JobStatus::Failed);
    assert_eq!(stored.attempts, 2);
}

#[tokio::test]
async fn health_reports_ok_with_a_reachable_store() {
    let harness = TestHarness::new();
    let (status, body) = harness.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"]["status"], "ok");
}
