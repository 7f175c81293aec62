//! Teardown sequencer - ordered precondition, transition, wait, destroy
//!
//! Some resources refuse deletion from certain states: an active authorizer
//! must be deactivated first, a thing type must be deprecated and then left
//! alone for a while. A [`TeardownPlan`] spells out those steps and
//! [`TeardownSequencer`] runs them strictly in order.
//!
//! Absence is success everywhere on this path. If the resource disappears
//! during a precondition probe, a transition or a wait, the rest of the plan
//! is skipped and the teardown reports [`TeardownOutcome::AlreadyAbsent`].

use crate::classify::ErrorClassifier;
use crate::context::WaitContext;
use crate::error::{Error, RemoteError, Result};
use crate::poller;
use crate::probe::StatusProbe;
use crate::retry;
use crate::types::{Observation, PollSpec, ResourceHandle, RetryPolicy};

/// A mutating remote call against one handle.
pub type RemoteCall<'a> = Box<dyn Fn(&ResourceHandle) -> std::result::Result<(), RemoteError> + 'a>;

/// Box a closure as a [`RemoteCall`].
pub fn remote_call<'a>(
    call: impl Fn(&ResourceHandle) -> std::result::Result<(), RemoteError> + 'a,
) -> RemoteCall<'a> {
    Box::new(call)
}

/// Decides whether a step's transition is needed.
pub enum Precondition<'a> {
    /// Always transition
    Always,
    /// Decided from locally known desired state, no probe needed
    Known(bool),
    /// Probe the resource and decide from its current status
    Observed(Box<dyn Fn(&Observation) -> bool + 'a>),
}

/// What to wait for between the transition and the destructive action.
#[derive(Debug, Clone)]
pub enum StepWait {
    /// Poll until the status converges, then destroy
    Poll(PollSpec),
    /// Retry the destructive action itself while it fails transiently
    RetryDestroy(RetryPolicy),
}

/// One step of a teardown plan.
pub struct TeardownStep<'a> {
    name: String,
    precondition: Precondition<'a>,
    transition: Option<RemoteCall<'a>>,
    wait: Option<StepWait>,
    proceed_on_timeout: bool,
    destroy: RemoteCall<'a>,
    settle: Option<PollSpec>,
    absent_is_success: bool,
}

impl<'a> TeardownStep<'a> {
    /// A step that just performs `destroy`
    pub fn new(name: impl Into<String>, destroy: RemoteCall<'a>) -> Self {
        Self {
            name: name.into(),
            precondition: Precondition::Always,
            transition: None,
            wait: None,
            proceed_on_timeout: false,
            destroy,
            settle: None,
            absent_is_success: true,
        }
    }

    /// Run `transition` before destroying, when `precondition` holds
    pub fn transition(mut self, precondition: Precondition<'a>, transition: RemoteCall<'a>) -> Self {
        self.precondition = precondition;
        self.transition = Some(transition);
        self
    }

    /// Wait between transition and destroy
    pub fn wait(mut self, wait: StepWait) -> Self {
        self.wait = Some(wait);
        self
    }

    /// Issue the destructive action once even if the wait runs out of time
    pub fn proceed_on_timeout(mut self) -> Self {
        self.proceed_on_timeout = true;
        self
    }

    /// Poll after the destructive action (for asynchronous deletes)
    pub fn settle(mut self, spec: PollSpec) -> Self {
        self.settle = Some(spec);
        self
    }

    /// Report not-found from the destructive action as an error
    pub fn absence_is_error(mut self) -> Self {
        self.absent_is_success = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Ordered list of teardown steps for one handle.
#[derive(Default)]
pub struct TeardownPlan<'a> {
    steps: Vec<TeardownStep<'a>>,
}

impl<'a> TeardownPlan<'a> {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Append a step
    pub fn step(mut self, step: TeardownStep<'a>) -> Self {
        self.steps.push(step);
        self
    }

    /// Plain delete; not-found is success
    pub fn direct(delete: RemoteCall<'a>) -> Self {
        Self::new().step(TeardownStep::new("delete", delete))
    }

    /// Deactivate when `is_active` holds for the current status, then delete
    pub fn deactivate_then_delete(
        is_active: impl Fn(&Observation) -> bool + 'a,
        deactivate: RemoteCall<'a>,
        delete: RemoteCall<'a>,
    ) -> Self {
        Self::new().step(
            TeardownStep::new("deactivate-then-delete", delete)
                .transition(Precondition::Observed(Box::new(is_active)), deactivate),
        )
    }

    /// Deprecate when `needs_deprecation` holds, retry delete while the
    /// remote asks us to wait, then make one final delete attempt if the
    /// retry budget runs out
    pub fn deprecate_then_delete(
        needs_deprecation: impl Fn(&Observation) -> bool + 'a,
        deprecate: RemoteCall<'a>,
        wait: RetryPolicy,
        delete: RemoteCall<'a>,
    ) -> Self {
        Self::new().step(
            TeardownStep::new("deprecate-then-delete", delete)
                .transition(Precondition::Observed(Box::new(needs_deprecation)), deprecate)
                .wait(StepWait::RetryDestroy(wait))
                .proceed_on_timeout(),
        )
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// How a teardown ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownOutcome {
    /// The destructive action removed the resource
    Removed,
    /// The resource was already gone
    AlreadyAbsent,
}

enum StepResult {
    Removed,
    Gone,
}

/// Runs teardown plans against one resource kind.
pub struct TeardownSequencer<'a> {
    ctx: &'a WaitContext,
    probe: StatusProbe<'a>,
    classifier: &'a dyn ErrorClassifier,
}

impl<'a> TeardownSequencer<'a> {
    pub fn new(
        ctx: &'a WaitContext,
        probe: StatusProbe<'a>,
        classifier: &'a dyn ErrorClassifier,
    ) -> Self {
        Self {
            ctx,
            probe,
            classifier,
        }
    }

    /// Run every step of `plan` in order.
    pub fn teardown(
        &self,
        handle: &ResourceHandle,
        plan: &TeardownPlan<'_>,
    ) -> Result<TeardownOutcome> {
        let mut outcome = TeardownOutcome::AlreadyAbsent;

        for step in &plan.steps {
            match self.run_step(handle, step)? {
                StepResult::Removed => outcome = TeardownOutcome::Removed,
                StepResult::Gone => {
                    log::debug!("{handle}: absent during {}, teardown complete", step.name);
                    return Ok(TeardownOutcome::AlreadyAbsent);
                }
            }
        }

        Ok(outcome)
    }

    fn run_step(&self, handle: &ResourceHandle, step: &TeardownStep<'_>) -> Result<StepResult> {
        self.ctx.checkpoint(&step.name)?;

        let needs_transition = match &step.precondition {
            Precondition::Always => true,
            Precondition::Known(holds) => *holds,
            Precondition::Observed(holds) => {
                let observation = self.probe.probe(handle)?;
                if observation.is_absent() {
                    return Ok(StepResult::Gone);
                }
                holds(&observation)
            }
        };

        if let Some(transition) = &step.transition {
            if needs_transition {
                log::debug!("{handle}: {} transition", step.name);
                match transition(handle) {
                    Ok(()) => {}
                    Err(e) if self.classifier.is_absent(&e) => return Ok(StepResult::Gone),
                    Err(e) => return Err(e.into()),
                }
            } else {
                log::debug!("{handle}: {} transition not needed", step.name);
            }
        }

        let destroyed = match &step.wait {
            None => self.destroy_once(handle, step)?,
            Some(StepWait::Poll(spec)) => {
                match poller::wait(self.ctx, &self.probe, handle, spec) {
                    Ok(observation) if observation.is_absent() => return Ok(StepResult::Gone),
                    Ok(_) => {}
                    Err(Error::Absent { .. }) => return Ok(StepResult::Gone),
                    Err(e) if e.is_timeout() && step.proceed_on_timeout => {
                        log::warn!("{handle}: {e}; attempting {} anyway", step.name);
                    }
                    Err(e) => return Err(e),
                }
                self.destroy_once(handle, step)?
            }
            Some(StepWait::RetryDestroy(policy)) => {
                self.destroy_with_retry(handle, step, policy)?
            }
        };

        if let StepResult::Gone = destroyed {
            return Ok(StepResult::Gone);
        }

        if let Some(spec) = &step.settle {
            match poller::wait(self.ctx, &self.probe, handle, spec) {
                Ok(_) | Err(Error::Absent { .. }) => {}
                Err(e) => return Err(e),
            }
        }

        Ok(StepResult::Removed)
    }

    fn destroy_once(&self, handle: &ResourceHandle, step: &TeardownStep<'_>) -> Result<StepResult> {
        log::debug!("{handle}: {} destroy", step.name);
        match (step.destroy)(handle) {
            Ok(()) => Ok(StepResult::Removed),
            Err(e) => self.absent_or_error(step, e),
        }
    }

    fn destroy_with_retry(
        &self,
        handle: &ResourceHandle,
        step: &TeardownStep<'_>,
        policy: &RetryPolicy,
    ) -> Result<StepResult> {
        let operation = format!("{} {handle}", step.name);
        match retry::retry(self.ctx, &operation, policy, self.classifier, || {
            (step.destroy)(handle)
        }) {
            Ok(()) => Ok(StepResult::Removed),
            Err(Error::Remote(e)) => {
                let exhausted = self.classifier.matches(&e, &policy.pattern_refs());
                if exhausted && step.proceed_on_timeout {
                    log::warn!(
                        "{handle}: still failing after {:?} ({e}); making a final {} attempt",
                        policy.max_elapsed,
                        step.name
                    );
                    self.destroy_once(handle, step)
                } else {
                    self.absent_or_error(step, e)
                }
            }
            Err(e) => Err(e),
        }
    }

    fn absent_or_error(&self, step: &TeardownStep<'_>, e: RemoteError) -> Result<StepResult> {
        if step.absent_is_success && self.classifier.is_absent(&e) {
            Ok(StepResult::Gone)
        } else {
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::CodeClassifier;
    use crate::context::ManualClock;
    use crate::types::Status;
    use std::cell::{Cell, RefCell};
    use std::sync::Arc;
    use std::time::Duration;

    const NOT_FOUND: &str = "ResourceNotFoundException";
    const WAIT_AFTER_DEPRECATION: &str = "Please wait for 5 minutes after deprecation";

    fn not_found() -> RemoteError {
        RemoteError::new(NOT_FOUND, "not found")
    }

    /// Fake remote resource recording every call in order.
    struct Remote {
        status: RefCell<Status>,
        calls: RefCell<Vec<&'static str>>,
    }

    impl Remote {
        fn new(status: Status) -> Self {
            Self {
                status: RefCell::new(status),
                calls: RefCell::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.borrow().clone()
        }

        fn record(&self, call: &'static str) {
            self.calls.borrow_mut().push(call);
        }
    }

    impl crate::probe::RemoteStatusApi for Remote {
        fn describe(
            &self,
            _handle: &ResourceHandle,
        ) -> std::result::Result<Observation, RemoteError> {
            self.record("describe");
            match &*self.status.borrow() {
                Status::Absent => Err(not_found()),
                s => Ok(Observation::new(s.clone())),
            }
        }
    }

    fn run(
        remote: &Remote,
        clock: &ManualClock,
        plan: &TeardownPlan<'_>,
    ) -> Result<TeardownOutcome> {
        let ctx = WaitContext::with_clock(Arc::new(clock.clone()));
        let classifier = CodeClassifier::new(&[NOT_FOUND]);
        let sequencer =
            TeardownSequencer::new(&ctx, StatusProbe::new(remote, &classifier), &classifier);
        sequencer.teardown(&ResourceHandle::new("r"), plan)
    }

    fn deactivate_then_delete(remote: &Remote) -> TeardownPlan<'_> {
        TeardownPlan::deactivate_then_delete(
            |obs| obs.status == Status::Active,
            remote_call(move |_| {
                remote.record("deactivate");
                if *remote.status.borrow() == Status::Absent {
                    return Err(not_found());
                }
                *remote.status.borrow_mut() = Status::Inactive;
                Ok(())
            }),
            remote_call(move |_| {
                remote.record("delete");
                match *remote.status.borrow() {
                    Status::Absent => return Err(not_found()),
                    Status::Active => {
                        return Err(RemoteError::new(
                            "InvalidRequestException",
                            "Cannot delete an active authorizer",
                        ));
                    }
                    _ => {}
                }
                *remote.status.borrow_mut() = Status::Absent;
                Ok(())
            }),
        )
    }

    #[test]
    fn test_deactivate_then_delete_when_active() {
        let remote = Remote::new(Status::Active);
        let plan = deactivate_then_delete(&remote);

        let outcome = run(&remote, &ManualClock::new(), &plan).unwrap();

        assert_eq!(outcome, TeardownOutcome::Removed);
        assert_eq!(remote.calls(), vec!["describe", "deactivate", "delete"]);
    }

    #[test]
    fn test_precondition_false_skips_transition() {
        let remote = Remote::new(Status::Inactive);
        let plan = deactivate_then_delete(&remote);

        let outcome = run(&remote, &ManualClock::new(), &plan).unwrap();

        assert_eq!(outcome, TeardownOutcome::Removed);
        assert_eq!(remote.calls(), vec!["describe", "delete"]);
    }

    #[test]
    fn test_absent_at_precondition_short_circuits() {
        let remote = Remote::new(Status::Absent);
        let plan = deactivate_then_delete(&remote);

        let outcome = run(&remote, &ManualClock::new(), &plan).unwrap();

        assert_eq!(outcome, TeardownOutcome::AlreadyAbsent);
        assert_eq!(remote.calls(), vec!["describe"]);
    }

    #[test]
    fn test_transition_absent_never_destroys() {
        let deleted = Cell::new(false);
        let plan = TeardownPlan::new().step(
            TeardownStep::new(
                "deactivate-then-delete",
                remote_call(|_| {
                    deleted.set(true);
                    Ok(())
                }),
            )
            .transition(Precondition::Known(true), remote_call(|_| Err(not_found()))),
        );

        let outcome = run(&Remote::new(Status::Active), &ManualClock::new(), &plan).unwrap();

        assert_eq!(outcome, TeardownOutcome::AlreadyAbsent);
        assert!(!deleted.get());
    }

    #[test]
    fn test_delete_twice_is_idempotent() {
        let remote = Remote::new(Status::Active);
        let clock = ManualClock::new();

        let first = run(&remote, &clock, &deactivate_then_delete(&remote)).unwrap();
        let second = run(&remote, &clock, &deactivate_then_delete(&remote)).unwrap();

        assert_eq!(first, TeardownOutcome::Removed);
        assert_eq!(second, TeardownOutcome::AlreadyAbsent);
    }

    #[test]
    fn test_destroy_absent_is_success() {
        let plan = TeardownPlan::direct(remote_call(|_| Err(not_found())));
        let outcome = run(&Remote::new(Status::Active), &ManualClock::new(), &plan).unwrap();
        assert_eq!(outcome, TeardownOutcome::AlreadyAbsent);
    }

    #[test]
    fn test_destroy_absent_as_error_when_configured() {
        let plan = TeardownPlan::new()
            .step(TeardownStep::new("delete", remote_call(|_| Err(not_found()))).absence_is_error());
        let err = run(&Remote::new(Status::Active), &ManualClock::new(), &plan).unwrap_err();
        assert_eq!(err.remote().unwrap().code, NOT_FOUND);
    }

    #[test]
    fn test_transition_failure_propagates_without_destroy() {
        let deleted = Cell::new(false);
        let plan = TeardownPlan::new().step(
            TeardownStep::new(
                "deactivate-then-delete",
                remote_call(|_| {
                    deleted.set(true);
                    Ok(())
                }),
            )
            .transition(
                Precondition::Always,
                remote_call(|_| Err(RemoteError::new("AccessDeniedException", "denied"))),
            ),
        );

        let err = run(&Remote::new(Status::Active), &ManualClock::new(), &plan).unwrap_err();

        assert_eq!(err.remote().unwrap().code, "AccessDeniedException");
        assert!(!deleted.get());
    }

    fn deprecation_wait() -> RetryPolicy {
        RetryPolicy::new(
            Duration::from_secs(10),
            Duration::from_secs(360),
            &[WAIT_AFTER_DEPRECATION],
        )
    }

    #[test]
    fn test_deprecate_then_retry_delete() {
        let clock = ManualClock::new();
        let deprecated_at = RefCell::new(None);
        let delete_attempts = Cell::new(0);
        let window = Duration::from_secs(300);

        let plan = TeardownPlan::deprecate_then_delete(
            |_| true,
            remote_call(|_| {
                *deprecated_at.borrow_mut() = Some(clock.elapsed());
                Ok(())
            }),
            deprecation_wait(),
            remote_call(|_| {
                delete_attempts.set(delete_attempts.get() + 1);
                let since = clock.elapsed() - deprecated_at.borrow().unwrap();
                if since < window {
                    Err(RemoteError::new(
                        "InvalidRequestException",
                        "Please wait for 5 minutes after deprecation and then retry",
                    ))
                } else {
                    Ok(())
                }
            }),
        );

        let outcome = run(&Remote::new(Status::Deprecated), &clock, &plan).unwrap();

        assert_eq!(outcome, TeardownOutcome::Removed);
        assert_eq!(delete_attempts.get(), 31);
        assert_eq!(clock.elapsed(), window);
    }

    #[test]
    fn test_deprecate_final_attempt_after_budget() {
        let clock = ManualClock::new();
        let delete_attempts = Cell::new(0);

        let plan = TeardownPlan::deprecate_then_delete(
            |_| true,
            remote_call(|_| Ok(())),
            RetryPolicy::new(
                Duration::from_secs(10),
                Duration::from_secs(30),
                &[WAIT_AFTER_DEPRECATION],
            ),
            remote_call(|_| {
                delete_attempts.set(delete_attempts.get() + 1);
                // Becomes deletable just after the client-side budget
                if delete_attempts.get() <= 4 {
                    Err(RemoteError::new(
                        "InvalidRequestException",
                        "Please wait for 5 minutes after deprecation and then retry",
                    ))
                } else {
                    Ok(())
                }
            }),
        );

        let outcome = run(&Remote::new(Status::Deprecated), &clock, &plan).unwrap();

        assert_eq!(outcome, TeardownOutcome::Removed);
        // 4 attempts inside the budget, then the final one
        assert_eq!(delete_attempts.get(), 5);
    }

    #[test]
    fn test_deprecate_final_attempt_failure_surfaces_original_error() {
        let clock = ManualClock::new();
        let plan = TeardownPlan::deprecate_then_delete(
            |_| true,
            remote_call(|_| Ok(())),
            RetryPolicy::new(
                Duration::from_secs(10),
                Duration::from_secs(30),
                &[WAIT_AFTER_DEPRECATION],
            ),
            remote_call(|_| {
                Err(RemoteError::new(
                    "InvalidRequestException",
                    "Please wait for 5 minutes after deprecation and then retry",
                ))
            }),
        );

        let err = run(&Remote::new(Status::Deprecated), &clock, &plan).unwrap_err();

        assert!(err.remote().unwrap().message.contains(WAIT_AFTER_DEPRECATION));
    }

    #[test]
    fn test_poll_wait_then_destroy() {
        let remote = Remote::new(Status::Active);
        let clock = ManualClock::new();
        let polls = Cell::new(0);

        let plan = TeardownPlan::new().step(
            TeardownStep::new(
                "disable-then-delete",
                remote_call(|_| {
                    remote.record("delete");
                    Ok(())
                }),
            )
            .transition(
                Precondition::Always,
                remote_call(|_| {
                    remote.record("disable");
                    *remote.status.borrow_mut() = Status::InProgress;
                    Ok(())
                }),
            )
            .wait(StepWait::Poll(
                PollSpec::creation(
                    &[Status::InProgress],
                    &[Status::Disabled],
                    Duration::from_secs(60),
                )
                .with_interval(Duration::from_secs(1)),
            )),
        );

        // Flip to DISABLED after the first probe
        let ctx = WaitContext::with_clock(Arc::new(clock.clone()));
        let classifier = CodeClassifier::new(&[NOT_FOUND]);
        let api = |h: &ResourceHandle| -> std::result::Result<Observation, RemoteError> {
            polls.set(polls.get() + 1);
            let obs = crate::probe::RemoteStatusApi::describe(&remote, h);
            if polls.get() == 1 {
                *remote.status.borrow_mut() = Status::Disabled;
            }
            obs
        };
        let sequencer = TeardownSequencer::new(&ctx, StatusProbe::new(&api, &classifier), &classifier);

        let outcome = sequencer.teardown(&ResourceHandle::new("r"), &plan).unwrap();

        assert_eq!(outcome, TeardownOutcome::Removed);
        assert_eq!(
            remote.calls(),
            vec!["disable", "describe", "describe", "delete"]
        );
    }

    fn disable_then_delete(remote: &Remote) -> TeardownStep<'_> {
        TeardownStep::new(
            "disable-then-delete",
            remote_call(move |_| {
                remote.record("delete");
                Ok(())
            }),
        )
        .transition(
            Precondition::Always,
            remote_call(move |_| {
                remote.record("disable");
                *remote.status.borrow_mut() = Status::InProgress;
                Ok(())
            }),
        )
        .wait(StepWait::Poll(
            PollSpec::creation(
                &[Status::InProgress],
                &[Status::Disabled],
                Duration::from_secs(10),
            )
            .with_interval(Duration::from_secs(5)),
        ))
    }

    #[test]
    fn test_poll_timeout_still_destroys_when_proceeding() {
        let remote = Remote::new(Status::Active);
        let clock = ManualClock::new();
        let plan = TeardownPlan::new().step(disable_then_delete(&remote).proceed_on_timeout());

        let outcome = run(&remote, &clock, &plan).unwrap();

        assert_eq!(outcome, TeardownOutcome::Removed);
        let calls = remote.calls();
        assert_eq!(calls.first(), Some(&"disable"));
        assert_eq!(calls.last(), Some(&"delete"));
        assert_eq!(calls.iter().filter(|c| **c == "delete").count(), 1);
        assert_eq!(clock.elapsed(), Duration::from_secs(10));
    }

    #[test]
    fn test_poll_timeout_without_proceeding_never_destroys() {
        let remote = Remote::new(Status::Active);
        let clock = ManualClock::new();
        let plan = TeardownPlan::new().step(disable_then_delete(&remote));

        let err = run(&remote, &clock, &plan).unwrap_err();

        assert!(err.is_timeout());
        assert!(!remote.calls().contains(&"delete"));
    }

    #[test]
    fn test_settle_waits_for_absence() {
        let remote = Remote::new(Status::Enabled);
        let clock = ManualClock::new();
        let plan = TeardownPlan::new().step(
            TeardownStep::new(
                "delete",
                remote_call(|_| {
                    remote.record("delete");
                    *remote.status.borrow_mut() = Status::Absent;
                    Ok(())
                }),
            )
            .settle(
                PollSpec::deletion(&[Status::Deleting], Duration::from_secs(60))
                    .with_interval(Duration::from_secs(1)),
            ),
        );

        let outcome = run(&remote, &clock, &plan).unwrap();

        assert_eq!(outcome, TeardownOutcome::Removed);
        assert_eq!(remote.calls(), vec!["delete", "describe"]);
    }

    #[test]
    fn test_settle_timeout_propagates() {
        let remote = Remote::new(Status::Enabled);
        let clock = ManualClock::new();
        let plan = TeardownPlan::new().step(
            TeardownStep::new(
                "delete",
                remote_call(|_| {
                    *remote.status.borrow_mut() = Status::Deleting;
                    Ok(())
                }),
            )
            .settle(
                PollSpec::deletion(&[Status::Deleting], Duration::from_secs(10))
                    .with_interval(Duration::from_secs(1)),
            ),
        );

        let err = run(&remote, &clock, &plan).unwrap_err();

        assert!(err.is_timeout());
    }

    #[test]
    fn test_already_deprecated_skips_deprecation() {
        let deprecated = Cell::new(false);
        let plan = TeardownPlan::deprecate_then_delete(
            |obs| obs.status != Status::Deprecated,
            remote_call(|_| {
                deprecated.set(true);
                Ok(())
            }),
            deprecation_wait(),
            remote_call(|_| Ok(())),
        );

        let outcome = run(&Remote::new(Status::Deprecated), &ManualClock::new(), &plan).unwrap();

        assert_eq!(outcome, TeardownOutcome::Removed);
        assert!(!deprecated.get());
    }
}
