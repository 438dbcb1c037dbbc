use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "efiling", about = "E-filing checklist automation")]
pub struct Cli {
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    pub verbose: bool,
    /// System configuration: folder rules, file map, logging.
    #[arg(long, global = true, default_value = "config/system.json")]
    pub config: PathBuf,
    /// User configuration: team, base folder, checklist policy.
    #[arg(long, global = true, default_value = "config/user.json")]
    pub user: PathBuf,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the folder status of one job folder as JSON.
    Status {
        #[arg(long)]
        job_dir: PathBuf,
    },
    /// Resolve, precheck and evaluate every job of a task sheet.
    Report {
        #[arg(long)]
        tasks: PathBuf,
        #[arg(long, default_value = "efiling_report.jsonl")]
        output: PathBuf,
    },
    /// List cached toggle coordinates.
    Cache {
        #[arg(long)]
        template: Option<String>,
    },
}
