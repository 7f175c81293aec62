//! Create/Update/Delete entry points for one resource kind
//!
//! A [`ResourceKind`] supplies the thin CRUD calls and says which parts of
//! the machinery it needs: a retry policy around create/update, an
//! activation poll, a teardown plan. A [`Reconciler`] composes those per
//! call. Kinds that need none of it get a direct pass-through call with no
//! added latency.

use crate::classify::ErrorClassifier;
use crate::context::WaitContext;
use crate::error::{RemoteError, Result};
use crate::poller;
use crate::probe::StatusProbe;
use crate::retry;
use crate::teardown::{TeardownOutcome, TeardownPlan, TeardownSequencer};
use crate::types::{
    ApplyResult, DEFAULT_POLL_INTERVAL, Observation, PollSpec, ReconcileOutcome, ResourceHandle,
    RetryPolicy, Status,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// One kind of remote resource.
///
/// Implementations hold their transport client; the engine only calls
/// through this trait.
pub trait ResourceKind {
    /// Typed desired configuration, validated once on entry
    type Config: DeserializeOwned;

    /// Registry name, e.g. `"role_alias"`
    fn kind(&self) -> &'static str;

    /// Every status the remote reports for this kind.
    ///
    /// Used by [`Reconciler::wait_for`] to tell pending statuses from
    /// unexpected ones.
    fn statuses(&self) -> &'static [Status] {
        &[]
    }

    /// Handle the resource described by `config` would have
    fn handle(&self, config: &Self::Config) -> ResourceHandle;

    /// Reject configuration combinations the remote would refuse.
    fn validate(&self, _config: &Self::Config) -> Result<()> {
        Ok(())
    }

    /// Retry policy around `create`, if creation races a propagation delay
    fn create_retry(&self, _config: &Self::Config) -> Option<RetryPolicy> {
        None
    }

    /// Retry policy around `update`
    fn update_retry(&self, _config: &Self::Config) -> Option<RetryPolicy> {
        None
    }

    /// Poll to run after a create or an effective update
    fn activation(&self, _config: &Self::Config) -> Option<PollSpec> {
        None
    }

    fn describe(&self, handle: &ResourceHandle) -> std::result::Result<Observation, RemoteError>;

    fn create(&self, config: &Self::Config) -> std::result::Result<ResourceHandle, RemoteError>;

    /// Apply `config` to an existing resource.
    ///
    /// Returns `false` when the resource already matched.
    fn update(
        &self,
        handle: &ResourceHandle,
        config: &Self::Config,
    ) -> std::result::Result<bool, RemoteError>;

    /// Ordered steps that remove the resource
    fn teardown_plan(&self, handle: &ResourceHandle) -> TeardownPlan<'_>;
}

impl<K: ResourceKind + ?Sized> ResourceKind for Arc<K> {
    type Config = K::Config;

    fn kind(&self) -> &'static str {
        (**self).kind()
    }

    fn statuses(&self) -> &'static [Status] {
        (**self).statuses()
    }

    fn handle(&self, config: &Self::Config) -> ResourceHandle {
        (**self).handle(config)
    }

    fn validate(&self, config: &Self::Config) -> Result<()> {
        (**self).validate(config)
    }

    fn create_retry(&self, config: &Self::Config) -> Option<RetryPolicy> {
        (**self).create_retry(config)
    }

    fn update_retry(&self, config: &Self::Config) -> Option<RetryPolicy> {
        (**self).update_retry(config)
    }

    fn activation(&self, config: &Self::Config) -> Option<PollSpec> {
        (**self).activation(config)
    }

    fn describe(&self, handle: &ResourceHandle) -> std::result::Result<Observation, RemoteError> {
        (**self).describe(handle)
    }

    fn create(&self, config: &Self::Config) -> std::result::Result<ResourceHandle, RemoteError> {
        (**self).create(config)
    }

    fn update(
        &self,
        handle: &ResourceHandle,
        config: &Self::Config,
    ) -> std::result::Result<bool, RemoteError> {
        (**self).update(handle, config)
    }

    fn teardown_plan(&self, handle: &ResourceHandle) -> TeardownPlan<'_> {
        (**self).teardown_plan(handle)
    }
}

/// Runs reconciliation operations for one kind within one wait context.
pub struct Reconciler<'a, K: ResourceKind> {
    kind: &'a K,
    classifier: &'a dyn ErrorClassifier,
    ctx: &'a WaitContext,
    poll_interval: Duration,
}

impl<'a, K: ResourceKind> Reconciler<'a, K> {
    pub fn new(kind: &'a K, classifier: &'a dyn ErrorClassifier, ctx: &'a WaitContext) -> Self {
        Self {
            kind,
            classifier,
            ctx,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Probe interval for [`wait_for`](Self::wait_for)
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Observe the resource once; not-found is an absent observation.
    pub fn probe(&self, handle: &ResourceHandle) -> Result<Observation> {
        let api = |h: &ResourceHandle| self.kind.describe(h);
        StatusProbe::new(&api, self.classifier).probe(handle)
    }

    /// Create the resource and wait for it to activate.
    pub fn create(&self, config: &K::Config) -> Result<ReconcileOutcome> {
        self.kind.validate(config)?;

        let operation = format!("create {} {}", self.kind.kind(), self.kind.handle(config));
        let handle = match self.kind.create_retry(config) {
            Some(policy) => retry::retry(self.ctx, &operation, &policy, self.classifier, || {
                self.kind.create(config)
            })?,
            None => self.kind.create(config)?,
        };
        log::info!("{}: created {handle}", self.kind.kind());

        let outcome = ReconcileOutcome::new(handle, ApplyResult::Created);
        self.activate(outcome, config)
    }

    /// Update an existing resource to match `config`.
    pub fn update(&self, handle: &ResourceHandle, config: &K::Config) -> Result<ReconcileOutcome> {
        self.kind.validate(config)?;

        let operation = format!("update {} {handle}", self.kind.kind());
        let changed = match self.kind.update_retry(config) {
            Some(policy) => retry::retry(self.ctx, &operation, &policy, self.classifier, || {
                self.kind.update(handle, config)
            })?,
            None => self.kind.update(handle, config)?,
        };

        if !changed {
            log::debug!("{}: {handle} already up to date", self.kind.kind());
            return Ok(ReconcileOutcome::new(handle.clone(), ApplyResult::NoChange));
        }
        log::info!("{}: updated {handle}", self.kind.kind());

        let outcome = ReconcileOutcome::new(handle.clone(), ApplyResult::Modified);
        self.activate(outcome, config)
    }

    /// Remove the resource. Deleting an absent resource succeeds.
    pub fn delete(&self, handle: &ResourceHandle) -> Result<ReconcileOutcome> {
        let api = |h: &ResourceHandle| self.kind.describe(h);
        let probe = StatusProbe::new(&api, self.classifier);
        let plan = self.kind.teardown_plan(handle);
        let sequencer = TeardownSequencer::new(self.ctx, probe, self.classifier);

        let result = match sequencer.teardown(handle, &plan)? {
            TeardownOutcome::Removed => {
                log::info!("{}: deleted {handle}", self.kind.kind());
                ApplyResult::Removed
            }
            TeardownOutcome::AlreadyAbsent => {
                log::info!("{}: {handle} already absent", self.kind.kind());
                ApplyResult::AlreadyAbsent
            }
        };
        Ok(ReconcileOutcome::new(handle.clone(), result))
    }

    /// Wait until the resource reports one of `targets`.
    ///
    /// Include [`Status::Absent`] in `targets` to wait for deletion.
    pub fn wait_for(
        &self,
        handle: &ResourceHandle,
        targets: &[Status],
        timeout: Duration,
    ) -> Result<Observation> {
        let spec = PollSpec::until(self.kind.statuses(), targets, timeout)
            .with_interval(self.poll_interval);
        let api = |h: &ResourceHandle| self.kind.describe(h);
        poller::wait(self.ctx, &StatusProbe::new(&api, self.classifier), handle, &spec)
    }

    /// Create when absent, update when present.
    pub fn ensure(&self, config: &K::Config) -> Result<ReconcileOutcome> {
        self.kind.validate(config)?;
        let handle = self.kind.handle(config);
        if self.probe(&handle)?.is_absent() {
            self.create(config)
        } else {
            self.update(&handle, config)
        }
    }

    fn activate(&self, outcome: ReconcileOutcome, config: &K::Config) -> Result<ReconcileOutcome> {
        let Some(spec) = self.kind.activation(config) else {
            return Ok(outcome);
        };
        let api = |h: &ResourceHandle| self.kind.describe(h);
        let observation = poller::wait(
            self.ctx,
            &StatusProbe::new(&api, self.classifier),
            &outcome.handle,
            &spec,
        )?;
        Ok(outcome.with_status(observation.status))
    }
}
