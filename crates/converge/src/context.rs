//! Wait context: clock, cancellation, deadline and observer
//!
//! Every retry and poll sleeps through a [`WaitContext`], so a caller can
//! interrupt a long wait from another thread and tests can run against
//! virtual time.

use crate::error::{CancelReason, Error, RemoteError, Result};
use crate::types::{Observation, ResourceHandle};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Source of time and sleeping for waits.
pub trait Clock: Send + Sync {
    /// Current monotonic time
    fn now(&self) -> Instant;

    /// Sleep for `duration`.
    ///
    /// Returns `false` if the sleep was cut short by `cancel`.
    fn sleep(&self, duration: Duration, cancel: &CancelToken) -> bool;
}

/// Wall-clock time; sleeps wake immediately on cancellation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration, cancel: &CancelToken) -> bool {
        cancel.wait_timeout(duration)
    }
}

/// Virtual time that only moves when something sleeps or calls `advance`.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    offset: Arc<Mutex<Duration>>,
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
            sleeps: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Move virtual time forward without recording a sleep
    pub fn advance(&self, by: Duration) {
        *self.offset.lock().unwrap_or_else(PoisonError::into_inner) += by;
    }

    /// Virtual time elapsed since creation
    pub fn elapsed(&self) -> Duration {
        *self.offset.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every sleep taken so far, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn sleep_count(&self) -> usize {
        self.sleeps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn sleep(&self, duration: Duration, cancel: &CancelToken) -> bool {
        if cancel.is_cancelled() {
            return false;
        }
        self.sleeps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(duration);
        self.advance(duration);
        true
    }
}

/// Cloneable, thread-safe cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel every wait sharing this token
    pub fn cancel(&self) {
        let (lock, cvar) = &*self.inner;
        *lock.lock().unwrap_or_else(PoisonError::into_inner) = true;
        cvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        let (lock, _) = &*self.inner;
        *lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block for up to `timeout`. Returns `true` if the full timeout passed.
    fn wait_timeout(&self, timeout: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = cvar
            .wait_timeout_while(guard, timeout, |cancelled| !*cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        !*guard
    }
}

/// Callback for retry and poll progress notifications.
pub trait WaitObserver: Send + Sync {
    /// Called before sleeping ahead of a retry.
    ///
    /// `attempt` is the 1-indexed attempt that just failed.
    fn on_retry(&self, _operation: &str, _attempt: u32, _error: &RemoteError, _delay: Duration) {}

    /// Called after each probe that did not end the wait.
    fn on_poll(&self, _handle: &ResourceHandle, _observation: &Observation, _elapsed: Duration) {}
}

/// Observer that does nothing.
pub struct NoObserver;

impl WaitObserver for NoObserver {}

/// Observer that forwards notifications to the `log` facade.
pub struct LogObserver;

impl WaitObserver for LogObserver {
    fn on_retry(&self, operation: &str, attempt: u32, error: &RemoteError, delay: Duration) {
        log::info!("{operation}: attempt {attempt} failed ({error}), retrying in {delay:?}");
    }

    fn on_poll(&self, handle: &ResourceHandle, observation: &Observation, elapsed: Duration) {
        log::info!(
            "{handle}: status {} after {:.1}s",
            observation.status,
            elapsed.as_secs_f64()
        );
    }
}

/// Per-invocation wait settings.
///
/// Constructed fresh for each Create/Update/Delete call; holds nothing that
/// outlives that call except the caller's own token and observer.
#[derive(Clone)]
pub struct WaitContext {
    clock: Arc<dyn Clock>,
    cancel: CancelToken,
    deadline: Option<Instant>,
    observer: Arc<dyn WaitObserver>,
}

impl WaitContext {
    /// Context on the system clock with no deadline
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Context on a specific clock
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            cancel: CancelToken::new(),
            deadline: None,
            observer: Arc::new(NoObserver),
        }
    }

    /// Share a caller-owned cancellation token
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Stop every wait at `deadline`
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Stop every wait `budget` from now
    pub fn with_budget(self, budget: Duration) -> Self {
        let deadline = self.clock.now() + budget;
        self.with_deadline(deadline)
    }

    pub fn with_observer(mut self, observer: Arc<dyn WaitObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn observer(&self) -> &dyn WaitObserver {
        self.observer.as_ref()
    }

    /// Fail with `Cancelled` if the token fired or the deadline passed.
    pub fn checkpoint(&self, operation: &str) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(cancelled(operation, CancelReason::Requested));
        }
        if let Some(deadline) = self.deadline
            && self.now() >= deadline
        {
            return Err(cancelled(operation, CancelReason::DeadlineExceeded));
        }
        Ok(())
    }

    /// Sleep for `duration`, honoring cancellation and the deadline.
    ///
    /// A sleep that would cross the deadline sleeps up to it and then fails
    /// with `DeadlineExceeded`.
    pub fn sleep(&self, operation: &str, duration: Duration) -> Result<()> {
        self.checkpoint(operation)?;

        let (duration, hits_deadline) = match self.deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(self.now());
                if remaining < duration {
                    (remaining, true)
                } else {
                    (duration, false)
                }
            }
            None => (duration, false),
        };

        if !self.clock.sleep(duration, &self.cancel) {
            return Err(cancelled(operation, CancelReason::Requested));
        }
        if hits_deadline {
            return Err(cancelled(operation, CancelReason::DeadlineExceeded));
        }
        Ok(())
    }
}

impl Default for WaitContext {
    fn default() -> Self {
        Self::new()
    }
}

fn cancelled(operation: &str, reason: CancelReason) -> Error {
    Error::Cancelled {
        operation: operation.to_string(),
        reason,
    }
}
