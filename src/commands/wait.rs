//! `ctlplane wait` - block until a resource reaches one of the given statuses

use anyhow::{Context as AnyhowContext, Result};
use converge::{ResourceHandle, Status, WaitContext};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::Context;
use crate::cli::WaitArgs;
use crate::ui;

/// Parse `--status` values; `ABSENT` waits for deletion
pub fn parse_targets(values: &[String]) -> Vec<Status> {
    values
        .iter()
        .filter(|v| !v.trim().is_empty())
        .map(|v| v.parse().unwrap_or_else(|never| match never {}))
        .collect()
}

pub fn run(ctx: &Context, args: WaitArgs) -> Result<()> {
    let WaitArgs {
        target,
        status,
        timeout,
    } = args;
    let targets = parse_targets(&status);
    let timeout = timeout.map_or_else(|| ctx.settings.wait_timeout(), Duration::from_secs);
    let orchestrator = ctx.orchestrator()?;

    let names: Vec<&str> = targets.iter().map(Status::as_str).collect();
    let spinner = Arc::new(ctx.spinner(&format!(
        "Waiting for {} {} to reach {}",
        target.kind,
        target.id,
        names.join("|")
    )));
    let wait = WaitContext::new().with_observer(spinner.clone());
    let handle = ResourceHandle::new(&target.id);

    let started = Instant::now();
    let observation = orchestrator.wait_for(&wait, &target.kind, &handle, &targets, timeout);
    spinner.finish();

    let observation = observation
        .with_context(|| format!("Failed waiting for {} {}", target.kind, target.id))?;
    ui::success(&format!(
        "{} {}: {} after {}",
        target.kind,
        target.id,
        ui::status(&observation.status),
        ui::format_duration(started.elapsed())
    ));
    Ok(())
}
