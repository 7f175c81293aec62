//! # converge
//!
//! Reconcile desired state against an eventually consistent control plane.
//!
//! Remote control planes acknowledge a mutation long before it takes
//! effect: a freshly created role cannot be assumed for a few seconds, a
//! destination sits in `IN_PROGRESS` until confirmed, a deprecated type
//! cannot be deleted for five minutes. This crate holds the shared waiting
//! machinery so resource implementations only supply thin CRUD calls.
//!
//! ## Core Concepts
//!
//! - **StatusProbe**: One describe call; not-found becomes [`Status::Absent`]
//! - **retry**: Fixed-interval retry while an error matches known transient patterns
//! - **poller**: Polls until a status reaches a target set, or times out with the last reason
//! - **TeardownSequencer**: Ordered precondition / transition / wait / destroy steps
//! - **Reconciler** and **Orchestrator**: Create/Update/Delete entry points per kind
//!
//! ## Example
//!
//! ```ignore
//! use converge::{CodeClassifier, Reconciler, WaitContext};
//!
//! let classifier = CodeClassifier::new(&["ResourceNotFoundException"]);
//! let ctx = WaitContext::new().with_budget(Duration::from_secs(600));
//! let reconciler = Reconciler::new(&role_aliases, &classifier, &ctx);
//!
//! let outcome = reconciler.create(&config)?;
//! println!("{} {:?}", outcome.handle, outcome.result);
//!
//! // Idempotent: a second delete observes absence and succeeds
//! reconciler.delete(&outcome.handle)?;
//! reconciler.delete(&outcome.handle)?;
//! ```
//!
//! ## Provider Traits
//!
//! - [`ResourceKind`]: CRUD calls and waiting policy for one kind
//! - [`ErrorClassifier`]: Absent / pattern-match predicates over remote errors
//! - [`Clock`]: Time source; [`ManualClock`] runs waits in virtual time
//! - [`WaitObserver`]: Receives retry and poll progress
//!
//! Nothing here is shared between calls. Each operation builds its policies
//! fresh and sleeps only on the calling thread, so an [`Orchestrator`] can
//! serve many threads at once.

pub mod classify;
pub mod context;
pub mod error;
pub mod poller;
pub mod probe;
pub mod reconcile;
pub mod registry;
pub mod retry;
pub mod teardown;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export main types at crate root
pub use classify::{CodeClassifier, ErrorClassifier};
pub use context::{
    CancelToken, Clock, LogObserver, ManualClock, NoObserver, SystemClock, WaitContext,
    WaitObserver,
};
pub use error::{CancelReason, Error, ErrorCategory, RemoteError, Result};
pub use probe::{RemoteStatusApi, StatusProbe};
pub use reconcile::{Reconciler, ResourceKind};
pub use registry::{DynReconcile, Factory, Orchestrator, Registry, Scope};
pub use retry::{retry, retry_if};
pub use teardown::{
    Precondition, RemoteCall, StepWait, TeardownOutcome, TeardownPlan, TeardownSequencer,
    TeardownStep, remote_call,
};
pub use types::{
    ApplyResult, DEFAULT_ABSENT_GRACE, DEFAULT_POLL_INTERVAL, Observation, PollSpec,
    ReconcileOutcome, ReconcileSummary, ResourceHandle, RetryPolicy, Status,
};
