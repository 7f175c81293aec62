//! `ctlplane apply` - reconcile every manifest entry
//!
//! Entries run in dependency tiers (roles before the aliases that point at
//! them, thing types before things). Within a tier they run in parallel on a
//! rayon pool; each call waits on its own thread.

use anyhow::{Context as AnyhowContext, Result, bail};
use colored::Colorize;
use converge::{ApplyResult, Orchestrator, ReconcileOutcome, ReconcileSummary, WaitContext};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::Context;
use crate::cli::ApplyArgs;
use crate::manifest::{Entry, Manifest};
use crate::resource::{self, Env};
use crate::ui;

/// Outcome of one manifest entry
pub struct Applied {
    pub kind: &'static str,
    /// Resource id, when the config could be decoded
    pub id: Option<String>,
    pub result: converge::Result<ReconcileOutcome>,
}

pub fn run(ctx: &Context, args: ApplyArgs) -> Result<()> {
    ui::header("Applying Manifest");

    if args.dry_run {
        ui::warn("Dry run - no changes will be made");
    }

    let manifest = Manifest::load(&args.manifest)?;
    let entries = manifest.entries()?;
    if entries.is_empty() {
        ui::info(&format!("{} declares no resources", args.manifest.display()));
        return Ok(());
    }
    ui::kv("Manifest", &args.manifest.display().to_string());
    ui::kv("Resources", &entries.len().to_string());

    let orchestrator = ctx.orchestrator()?;
    let spinner = Arc::new(ctx.spinner("Reconciling"));
    let mut wait = WaitContext::new().with_observer(spinner.clone());
    if let Some(secs) = args.budget {
        wait = wait.with_budget(Duration::from_secs(secs));
    }

    let started = Instant::now();
    let applied = reconcile(&orchestrator, &wait, &entries, args.jobs, args.dry_run)?;
    spinner.finish();

    let summary = summarize(&applied);
    ui::section("Results");
    for entry in &applied {
        match &entry.result {
            Ok(outcome) => ui::outcome(entry.kind, outcome),
            Err(e) => {
                let id = entry.id.as_deref().unwrap_or("?");
                ui::error(&format!("{} {id}: {e}", entry.kind));
                if ctx.verbose > 0 {
                    println!("    {}", e.category().description().dimmed());
                }
            }
        }
    }
    ui::summary(&summary, started.elapsed());

    if !summary.is_success() {
        bail!("{} of {} resources failed", summary.failed, summary.total());
    }
    Ok(())
}

/// Reconcile `entries` tier by tier, `jobs` at a time
pub fn reconcile(
    orchestrator: &Orchestrator<Env>,
    wait: &WaitContext,
    entries: &[Entry],
    jobs: usize,
    dry_run: bool,
) -> Result<Vec<Applied>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .build()
        .context("Failed to build thread pool")?;

    let mut applied = Vec::with_capacity(entries.len());
    for (tier, group) in by_tier(entries) {
        log::debug!("tier {tier}: {} entries", group.len());
        let results: Vec<Applied> = pool.install(|| {
            group
                .par_iter()
                .map(|entry| apply_one(orchestrator, wait, entry, dry_run))
                .collect()
        });
        applied.extend(results);
    }
    Ok(applied)
}

fn by_tier(entries: &[Entry]) -> BTreeMap<usize, Vec<&Entry>> {
    let mut tiers: BTreeMap<usize, Vec<&Entry>> = BTreeMap::new();
    for entry in entries {
        tiers.entry(resource::tier(entry.kind)).or_default().push(entry);
    }
    tiers
}

fn apply_one(
    orchestrator: &Orchestrator<Env>,
    wait: &WaitContext,
    entry: &Entry,
    dry_run: bool,
) -> Applied {
    let handle = orchestrator.handle(entry.kind, &entry.config);
    let id = handle.as_ref().ok().map(ToString::to_string);

    let result = handle.and_then(|handle| {
        if dry_run {
            let observed = orchestrator.probe(wait, entry.kind, &handle)?;
            let reason = if observed.is_absent() {
                "would create"
            } else {
                "exists, would update if changed"
            };
            let outcome = ReconcileOutcome::new(
                handle,
                ApplyResult::Skipped {
                    reason: reason.to_string(),
                },
            );
            Ok(outcome.with_status(observed.status))
        } else {
            orchestrator.ensure(wait, entry.kind, &entry.config)
        }
    });

    if let Err(e) = &result {
        log::debug!("{} {}: {e}", entry.kind, id.as_deref().unwrap_or("?"));
    }
    Applied {
        kind: entry.kind,
        id,
        result,
    }
}

pub fn summarize(applied: &[Applied]) -> ReconcileSummary {
    let mut summary = ReconcileSummary::default();
    for entry in applied {
        match &entry.result {
            Ok(outcome) => summary.add(&outcome.result),
            Err(_) => summary.add_failure(),
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ControlPlane, ResourceType};
    use crate::resource::Policies;
    use crate::resource::testing::harness;
    use converge::{Error, Status};

    const MANIFEST: &str = r#"
[[role]]
name = "iot-access"

[[role_alias]]
alias = "device-access"
role_arn = "arn:aws:iam::123456789012:role/iot-access"

[[thing_type]]
name = "sensor"

[[thing]]
name = "sensor-1"
thing_type_name = "sensor"

[[topic_rule_destination]]
name = "hook"
endpoint_url = "https://example.com/hook"
"#;

    fn entries() -> Vec<Entry> {
        Manifest::parse(MANIFEST).unwrap().entries().unwrap()
    }

    #[test]
    fn test_apply_creates_every_entry_in_tier_order() {
        let h = harness();
        let orchestrator = resource::orchestrator(Env::new(h.sandbox.clone(), Policies::default()));

        let applied = reconcile(&orchestrator, &h.ctx, &entries(), 2, false).unwrap();
        let summary = summarize(&applied);

        assert!(summary.is_success());
        assert_eq!(summary.created, 5);
        let kinds: Vec<&str> = applied.iter().map(|a| a.kind).collect();
        assert_eq!(&kinds[3..], &["role_alias", "thing"]);
        let destination = h
            .sandbox
            .describe(ResourceType::TopicRuleDestination, "hook")
            .unwrap();
        assert_eq!(destination.status, Status::Enabled);
    }

    #[test]
    fn test_second_apply_is_unchanged() {
        let h = harness();
        let orchestrator = resource::orchestrator(Env::new(h.sandbox.clone(), Policies::default()));
        reconcile(&orchestrator, &h.ctx, &entries(), 2, false).unwrap();

        let applied = reconcile(&orchestrator, &h.ctx, &entries(), 2, false).unwrap();
        let summary = summarize(&applied);

        assert_eq!(summary.unchanged, 5);
        assert_eq!(summary.total_changes(), 0);
    }

    #[test]
    fn test_dry_run_only_probes() {
        let h = harness();
        let orchestrator = resource::orchestrator(Env::new(h.sandbox.clone(), Policies::default()));

        let applied = reconcile(&orchestrator, &h.ctx, &entries(), 2, true).unwrap();
        let summary = summarize(&applied);

        assert_eq!(summary.skipped, 5);
        assert!(h.sandbox.list(ResourceType::Role).unwrap().is_empty());
        assert_eq!(h.clock.sleep_count(), 0);
    }

    #[test]
    fn test_invalid_entry_fails_alone() {
        let h = harness();
        let orchestrator = resource::orchestrator(Env::new(h.sandbox.clone(), Policies::default()));
        let mut entries = entries();
        entries.push(Entry {
            kind: "thing_type",
            config: serde_json::json!({
                "name": "too-many",
                "searchable_attributes": ["a", "b", "c", "d"],
            }),
        });

        let applied = reconcile(&orchestrator, &h.ctx, &entries, 1, false).unwrap();
        let summary = summarize(&applied);

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.created, 5);
        let failed = applied.iter().find(|a| a.result.is_err()).unwrap();
        assert_eq!(failed.id.as_deref(), Some("too-many"));
        assert!(matches!(
            failed.result,
            Err(Error::Precondition { .. })
        ));
    }
}
