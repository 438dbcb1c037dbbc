use std::env;
use std::fs::{self, OpenOptions};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

/// `RUST_LOG` wins, then the verbose switch, then the configured level.
pub fn init(verbose: bool, config: &LogConfig) -> Result<()> {
    let level = filter_directive(verbose, config);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    let console = config
        .log_to_console
        .then(|| fmt::layer().with_writer(std::io::stderr));
    let file = if config.log_to_file {
        let path = &config.log_file_path;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create log folder {}", parent.display()))?;
        }
        let handle = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(handle)))
    } else {
        None
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init();
    if verbose {
        tracing::debug!("verbose logging enabled");
    }
    Ok(())
}

fn filter_directive(verbose: bool, config: &LogConfig) -> String {
    if verbose {
        "debug".to_string()
    } else {
        match config.level.trim().to_lowercase().as_str() {
            "warning" => "warn".to_string(),
            "critical" | "fatal" => "error".to_string(),
            other => other.to_string(),
        }
    }
}

pub fn env_flag() -> bool {
    env::var("EFILING_VERBOSE")
        .map(|value| parse_bool(value.trim()))
        .unwrap_or(false)
}

fn parse_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
