mod backend;
mod cli;
mod commands;
mod config;
mod manifest;
mod progress;
mod resource;
mod ui;

use anyhow::{Context as AnyhowContext, Result};
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use config::Settings;
use converge::Orchestrator;
use progress::Spinner;
use resource::Env;
use std::io;
use std::sync::Arc;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub settings: Settings,
}

impl Context {
    /// Orchestrator over the sandbox control plane
    pub fn orchestrator(&self) -> Result<Orchestrator<Env>> {
        let path = self.settings.state_file();
        let sandbox = backend::Sandbox::open(&path, self.settings.behavior())
            .with_context(|| format!("Failed to open sandbox state {}", path.display()))?;
        let env = Env::new(Arc::new(sandbox), self.settings.policies());
        Ok(resource::orchestrator(env))
    }

    /// Spinner, or a hidden one in quiet mode
    pub fn spinner(&self, msg: &str) -> Spinner {
        if self.quiet {
            Spinner::hidden()
        } else {
            Spinner::new(msg)
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let settings = Settings::load(cli.config.as_deref())?;
    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        settings,
    };

    match cli.command {
        Command::Apply(args) => commands::apply::run(&ctx, args),
        Command::Delete(args) => commands::delete::run(&ctx, args),
        Command::Wait(args) => commands::wait::run(&ctx, args),
        Command::Status(args) => commands::status::run(&ctx, args),
        Command::Kinds => commands::status::kinds(&ctx),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "ctlplane", &mut io::stdout());
            Ok(())
        }
    }
}
