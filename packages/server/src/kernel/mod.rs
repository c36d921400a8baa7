//! Kernel-level infrastructure: the automation job queue, provider adapters,
//! and the append-only communication log. Business-facing HTTP entry points
//! live in [`crate::server`]; this module owns the dispatch semantics.

pub mod audit;
pub mod jobs;
pub mod providers;

pub use audit::{AuditWriter, CommunicationLog, LogStatus, NewCommunicationLog, PostgresAuditWriter};
pub use jobs::{
    resolve_payload, Channel, CycleOutcome, Dispatcher, Job, JobStatus, JobStore, PayloadError,
    PostgresJobStore, RetryOutcome, RetryPolicy, SendRequest,
};
pub use providers::{ProviderAdapter, ProviderRegistry, SendError, SendOutcome};
