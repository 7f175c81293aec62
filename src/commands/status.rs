//! `ctlplane status` and `ctlplane kinds`

use anyhow::{Context as AnyhowContext, Result};
use converge::{ResourceHandle, Status, WaitContext};

use crate::Context;
use crate::cli::TargetArgs;
use crate::ui;

pub fn run(ctx: &Context, args: TargetArgs) -> Result<()> {
    let orchestrator = ctx.orchestrator()?;
    let handle = ResourceHandle::new(&args.id);

    let observation = orchestrator
        .probe(&WaitContext::new(), &args.kind, &handle)
        .with_context(|| format!("Failed to probe {} {}", args.kind, args.id))?;

    ui::header(&format!("{} {}", args.kind, args.id));
    ui::kv("Status", &ui::status(&observation.status).to_string());
    if let Some(reason) = &observation.reason {
        ui::kv("Reason", reason);
    }
    if let Some(arn) = &observation.arn {
        ui::kv("ARN", arn);
    }
    Ok(())
}

pub fn kinds(ctx: &Context) -> Result<()> {
    let orchestrator = ctx.orchestrator()?;

    ui::header("Resource Kinds");
    for kind in orchestrator.kinds() {
        let statuses = orchestrator.statuses(kind)?;
        let names: Vec<&str> = statuses.iter().map(Status::as_str).collect();
        ui::kv(kind, &names.join(", "));
    }
    Ok(())
}
