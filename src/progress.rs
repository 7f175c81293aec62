//! Progress indicators for the ctlplane CLI.
//!
//! A [`Spinner`] doubles as the engine's [`WaitObserver`], so retries and
//! polls show up while a command is waiting on the control plane.

use crate::ui;
use converge::{Observation, RemoteError, ResourceHandle, WaitObserver};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub struct Spinner {
    bar: ProgressBar,
}

impl Spinner {
    pub fn new(msg: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.green} {msg} {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(msg.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    /// Spinner that never draws (quiet mode, tests)
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn set_message(&self, msg: impl Into<String>) {
        self.bar.set_message(msg.into());
    }

    /// Run `f` with the spinner hidden so its output is not overdrawn
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        self.bar.suspend(f)
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    pub fn message(&self) -> String {
        self.bar.message()
    }
}

impl WaitObserver for Spinner {
    fn on_retry(&self, operation: &str, attempt: u32, error: &RemoteError, delay: Duration) {
        log::debug!("{operation}: attempt {attempt} failed: {error}");
        self.set_message(format!(
            "{operation}: attempt {attempt} failed ({}), retrying in {}",
            error.code,
            ui::format_duration(delay)
        ));
    }

    fn on_poll(&self, handle: &ResourceHandle, observation: &Observation, elapsed: Duration) {
        let reason = observation
            .reason
            .as_deref()
            .map(|r| format!(" - {r}"))
            .unwrap_or_default();
        self.set_message(format!(
            "{handle}: {}{reason} ({})",
            observation.status,
            ui::format_duration(elapsed)
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use converge::Status;

    #[test]
    fn test_poll_updates_message() {
        let spinner = Spinner::hidden();
        let obs = Observation::new(Status::InProgress).with_reason("awaiting confirmation");

        spinner.on_poll(&ResourceHandle::new("hook"), &obs, Duration::from_secs(10));

        assert_eq!(
            spinner.message(),
            "hook: IN_PROGRESS - awaiting confirmation (10s)"
        );
    }

    #[test]
    fn test_retry_updates_message() {
        let spinner = Spinner::hidden();
        let err = RemoteError::new("InvalidRequestException", "cannot be assumed");

        spinner.on_retry("create role_alias a", 2, &err, Duration::from_secs(1));

        assert!(spinner.message().contains("attempt 2 failed (InvalidRequestException)"));
    }
}
