mod cache;
mod cli;
mod config;
mod logging;
mod report;
mod status;

use anyhow::Result;
use clap::Parser;

use crate::cli::{Cli, Command};
use crate::config::{SystemConfig, UserConfig};

/// Configuration shared by every command.
pub struct AppContext {
    pub system: SystemConfig,
    pub user: UserConfig,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbose = if cli.verbose {
        true
    } else {
        logging::env_flag()
    };
    let ctx = AppContext {
        system: SystemConfig::load(&cli.config)?,
        user: UserConfig::load(&cli.user)?,
    };
    logging::init(verbose, &ctx.system.log)?;
    tracing::debug!(
        team = %ctx.user.team,
        base_dir = %ctx.user.base_dir.display(),
        policy = ?ctx.user.policy(),
        templates = %ctx.user.templates_dir.display(),
        signs = %ctx.user.signs_dir.display(),
        "configuration loaded"
    );
    match cli.command {
        Command::Status { job_dir } => status::run(&ctx, &job_dir),
        Command::Report { tasks, output } => report::run(&ctx, &tasks, &output),
        Command::Cache { template } => cache::run(&ctx, template.as_deref()),
    }
}
