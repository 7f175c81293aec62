use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ctlplane")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Reconcile IoT control-plane resources against a desired-state manifest", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Settings file (default: ~/.config/ctlplane/config.toml)
    #[arg(long, global = true, env = "CTLPLANE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create or update every resource in a manifest
    Apply(ApplyArgs),

    /// Delete a resource (succeeds if it is already gone)
    Delete(DeleteArgs),

    /// Wait until a resource reaches a status
    Wait(WaitArgs),

    /// Show the current status of a resource
    Status(TargetArgs),

    /// List the resource kinds this build knows about
    Kinds,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Arguments
// ============================================================================

#[derive(Args)]
pub struct ApplyArgs {
    /// Manifest file
    #[arg(short = 'f', long = "file", default_value = "ctlplane.toml")]
    pub manifest: PathBuf,

    /// Number of resources reconciled in parallel
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,

    /// Dry run - probe only, show what would change
    #[arg(short, long)]
    pub dry_run: bool,

    /// Give up on the whole apply after this many seconds
    #[arg(long, value_name = "SECS")]
    pub budget: Option<u64>,
}

#[derive(Args)]
pub struct TargetArgs {
    /// Resource kind (see `ctlplane kinds`)
    pub kind: String,

    /// Resource id
    pub id: String,
}

#[derive(Args)]
pub struct DeleteArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Args)]
pub struct WaitArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Target statuses, e.g. ACTIVE or ENABLED,DISABLED; ABSENT waits for deletion
    #[arg(short, long, value_delimiter = ',', required = true)]
    pub status: Vec<String>,

    /// Seconds to wait (default from settings)
    #[arg(short, long)]
    pub timeout: Option<u64>,
}
