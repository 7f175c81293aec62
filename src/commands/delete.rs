//! `ctlplane delete` - idempotent teardown of one resource

use anyhow::{Context as AnyhowContext, Result, bail};
use converge::{ResourceHandle, WaitContext};
use std::io::IsTerminal;
use std::sync::Arc;

use crate::Context;
use crate::cli::DeleteArgs;
use crate::ui;

pub fn run(ctx: &Context, args: DeleteArgs) -> Result<()> {
    let DeleteArgs { target, yes } = args;
    let orchestrator = ctx.orchestrator()?;
    if !orchestrator.registry().contains(&target.kind) {
        bail!(
            "Unknown kind '{}' (known: {})",
            target.kind,
            orchestrator.kinds().join(", ")
        );
    }

    if !yes {
        if !std::io::stdin().is_terminal() {
            bail!("Refusing to delete without confirmation; pass --yes");
        }
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(format!("Delete {} {}?", target.kind, target.id))
            .default(false)
            .interact()
            .context("Failed to read confirmation")?;
        if !confirmed {
            ui::info("Nothing deleted");
            return Ok(());
        }
    }

    let spinner = Arc::new(ctx.spinner(&format!("Deleting {} {}", target.kind, target.id)));
    let wait = WaitContext::new().with_observer(spinner.clone());
    let handle = ResourceHandle::new(&target.id);

    let outcome = orchestrator.delete(&wait, &target.kind, &handle);
    spinner.finish();

    let outcome =
        outcome.with_context(|| format!("Failed to delete {} {}", target.kind, target.id))?;
    ui::outcome(&target.kind, &outcome);
    Ok(())
}
