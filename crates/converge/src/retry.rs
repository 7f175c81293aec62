//! Conditional retry with a fixed interval for known-transient errors.
//!
//! Only errors matching an allow-list are retried; anything else returns on
//! the first attempt. When the time budget runs out the last remote error
//! is returned as-is, never a synthetic timeout.

use crate::classify::ErrorClassifier;
use crate::context::WaitContext;
use crate::error::{RemoteError, Result};
use crate::types::RetryPolicy;
use std::time::Duration;

/// Execute an operation, retrying while `is_transient` holds.
///
/// Sleeps `interval` between attempts and never starts an attempt that would
/// begin after `max_elapsed`. An operation that succeeds first time incurs
/// no sleep.
///
/// # Arguments
/// * `ctx` - Clock, cancellation and observer for the sleeps
/// * `operation_name` - Label used in logs and cancellation errors
/// * `interval` - Fixed delay between attempts
/// * `max_elapsed` - Total retry budget
/// * `is_transient` - Whether an error is worth retrying
/// * `operation` - The remote call
pub fn retry_if<T, F, P>(
    ctx: &WaitContext,
    operation_name: &str,
    interval: Duration,
    max_elapsed: Duration,
    is_transient: P,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> std::result::Result<T, RemoteError>,
    P: Fn(&RemoteError) -> bool,
{
    let start = ctx.now();
    let mut attempt: u32 = 0;

    loop {
        ctx.checkpoint(operation_name)?;
        attempt += 1;

        let error = match operation() {
            Ok(value) => {
                if attempt > 1 {
                    log::debug!("{operation_name}: succeeded on attempt {attempt}");
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        if !is_transient(&error) {
            log::debug!("{operation_name}: not retrying ({error})");
            return Err(error.into());
        }

        let elapsed = ctx.now().saturating_duration_since(start);
        if elapsed + interval > max_elapsed {
            log::debug!(
                "{operation_name}: retry budget of {max_elapsed:?} exhausted after {attempt} attempts"
            );
            return Err(error.into());
        }

        ctx.observer()
            .on_retry(operation_name, attempt, &error, interval);
        log::debug!("{operation_name}: attempt {attempt} failed ({error}), retrying in {interval:?}");
        ctx.sleep(operation_name, interval)?;
    }
}

/// Execute an operation under a [`RetryPolicy`].
///
/// An error is transient when its code or message contains one of the
/// policy's patterns.
pub fn retry<T, F>(
    ctx: &WaitContext,
    operation_name: &str,
    policy: &RetryPolicy,
    classifier: &dyn ErrorClassifier,
    operation: F,
) -> Result<T>
where
    F: FnMut() -> std::result::Result<T, RemoteError>,
{
    let patterns = policy.pattern_refs();
    retry_if(
        ctx,
        operation_name,
        policy.interval,
        policy.max_elapsed,
        |e| classifier.matches(e, &patterns),
        operation,
    )
}
