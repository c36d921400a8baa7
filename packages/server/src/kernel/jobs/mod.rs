//! Automation job queue infrastructure.
//!
//! ```text
//! External trigger (cron / admin)
//!     │
//!     ▼
//! Dispatcher.run_cycle(limit)
//!     ├─► JobStore.fetch_due(limit)
//!     ├─► per job: JobStore.claim(id)          conditional single-row update
//!     ├─► resolve_payload(..) → SendRequest    action resolved once at intake
//!     ├─► ProviderRegistry → adapter.send(..)  bounded by a timeout
//!     └─► mark_sent / apply_retry / mark_failed + one audit entry per attempt
//! ```
//!
//! Multiple concurrent invocations are safe: the per-job claim is the only
//! synchronization primitive, and it relies on the store's atomic single-row
//! conditional update. No in-process lock is held across I/O.

mod dispatcher;
mod job;
mod payload;
mod policy;
mod store;
pub mod testing;

pub use dispatcher::{CycleOutcome, Dispatcher};
pub use job::{Job, JobStatus};
pub use payload::{resolve_payload, Action, Channel, PayloadError, SendRequest};
pub use policy::{RetryOutcome, RetryPolicy};
pub use store::{JobStore, PostgresJobStore};
