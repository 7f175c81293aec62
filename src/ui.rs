//! Terminal output for the CLI commands

use colored::{ColoredString, Colorize};
use converge::{ApplyResult, ReconcileOutcome, ReconcileSummary, Status};
use std::time::Duration;

fn mark(symbol: ColoredString, msg: &str) {
    println!("{symbol} {msg}");
}

/// Progress note, e.g. which settings file was loaded
pub fn info(msg: &str) {
    mark("ℹ".blue(), msg);
}

/// A reconcile step that changed something remote
pub fn success(msg: &str) {
    mark("✓".green(), msg);
}

/// Recoverable problem; the command keeps going
pub fn warn(msg: &str) {
    mark("⚠".yellow(), msg);
}

/// Fatal or per-resource failure, written to stderr
pub fn error(msg: &str) {
    eprintln!("{} {msg}", "✗".red());
}

/// Indented, muted line for things that did not change
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Command title underlined to its width
pub fn header(title: &str) {
    // Character count, not bytes: resource names are not always ASCII
    let width = title.chars().count();
    println!("\n{}\n{}", title.bold(), "─".repeat(width).dimmed());
}

/// Group heading inside a command's output, e.g. one resource kind
pub fn section(title: &str) {
    println!("\n{}", title.cyan().bold());
}

/// Indented `key: value` line
pub fn kv(key: &str, value: &str) {
    println!("  {}: {value}", key.dimmed());
}

fn past_tense(result: &ApplyResult) -> &str {
    match result {
        ApplyResult::NoChange => "unchanged",
        ApplyResult::Created => "created",
        ApplyResult::Modified => "updated",
        ApplyResult::Removed => "deleted",
        ApplyResult::AlreadyAbsent => "already absent",
        ApplyResult::Skipped { reason } => reason,
    }
}

/// Status colored by how settled it is
pub fn status(status: &Status) -> ColoredString {
    let text = status.as_str();
    match status {
        Status::Active | Status::Enabled => text.green(),
        Status::InProgress | Status::Deleting | Status::PendingTransfer => text.yellow(),
        Status::Error => text.red(),
        Status::Absent => text.dimmed(),
        _ => text.normal(),
    }
}

/// Print one reconcile outcome
pub fn outcome(kind: &str, outcome: &ReconcileOutcome) {
    let label = format!("{kind} {}", outcome.handle);
    let verb = past_tense(&outcome.result);
    let line = match &outcome.status {
        Some(s) => format!("{label}: {verb} ({})", status(s)),
        None => format!("{label}: {verb}"),
    };
    if outcome.result.is_change() {
        success(&line);
    } else {
        dim(&line);
    }
}

/// Print a batch summary
pub fn summary(summary: &ReconcileSummary, elapsed: Duration) {
    println!();
    let counts = format!(
        "{} created, {} updated, {} deleted, {} unchanged",
        summary.created, summary.modified, summary.removed, summary.unchanged
    );
    if summary.is_success() {
        success(&format!("{counts} in {}", format_duration(elapsed)));
    } else {
        error(&format!(
            "{counts}, {} failed in {}",
            summary.failed,
            format_duration(elapsed)
        ));
    }
}

/// Format a duration as `1m 05s` / `12s` / `350ms`
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs >= 60 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else if secs > 0 {
        format!("{secs}s")
    } else {
        format!("{}ms", d.as_millis())
    }
}
