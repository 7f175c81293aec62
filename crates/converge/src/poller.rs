//! Convergence poller - waits for a remote status to reach a target set
//!
//! The poller is a small state machine over successive probes:
//!
//! - status in `target` → converged
//! - status in `pending` → sleep one interval and probe again
//! - Absent → converged for deletion waits; tolerated up to
//!   `absent_grace` consecutive times for creation waits, then `Error::Absent`
//! - any other status → `Error::UnexpectedStatus`, no further polling
//! - `timeout` elapsed while pending → `Error::PollTimeout` carrying the
//!   last status and reason

use crate::context::WaitContext;
use crate::error::{Error, Result};
use crate::probe::StatusProbe;
use crate::types::{Observation, PollSpec, ResourceHandle};

/// Poll `handle` until it converges according to `spec`.
///
/// Returns the final observation. Only a target status, or absence in a
/// deletion wait, counts as convergence.
pub fn wait(
    ctx: &WaitContext,
    probe: &StatusProbe<'_>,
    handle: &ResourceHandle,
    spec: &PollSpec,
) -> Result<Observation> {
    let operation = format!("waiting for {handle}");
    let start = ctx.now();
    let mut consecutive_absent: u32 = 0;

    log::debug!(
        "{operation}: target {} (timeout {:?}, interval {:?})",
        spec.describe_target(),
        spec.timeout,
        spec.interval
    );

    loop {
        ctx.checkpoint(&operation)?;
        let observation = probe.probe(handle)?;

        if spec.target.contains(&observation.status) {
            log::debug!("{operation}: converged at {}", observation.status);
            return Ok(observation);
        }

        if observation.is_absent() {
            if spec.absent_is_success {
                log::debug!("{operation}: resource is gone");
                return Ok(observation);
            }
            consecutive_absent += 1;
            if consecutive_absent > spec.absent_grace {
                return Err(Error::Absent {
                    handle: handle.clone(),
                });
            }
        } else if spec.pending.contains(&observation.status) {
            consecutive_absent = 0;
        } else {
            return Err(Error::UnexpectedStatus {
                handle: handle.clone(),
                status: observation.status,
                reason: observation.reason,
            });
        }

        let elapsed = ctx.now().saturating_duration_since(start);
        ctx.observer().on_poll(handle, &observation, elapsed);

        if elapsed >= spec.timeout {
            return Err(Error::PollTimeout {
                handle: handle.clone(),
                target: spec.describe_target(),
                timeout: spec.timeout,
                last_status: observation.status,
                reason: observation.reason,
            });
        }

        // Never sleep past the timeout; the final probe lands on it.
        let remaining = spec.timeout - elapsed;
        ctx.sleep(&operation, spec.interval.min(remaining))?;
    }
}
