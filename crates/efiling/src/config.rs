use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use efiling_core::{ChecklistPolicy, RuleConfig, Team};
use indexmap::IndexMap;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default = "default_true")]
    pub log_to_console: bool,
    #[serde(default)]
    pub log_to_file: bool,
    #[serde(default = "default_log_file")]
    pub log_file_path: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            log_to_console: true,
            log_to_file: false,
            log_file_path: default_log_file(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_file() -> PathBuf {
    PathBuf::from("app.log")
}

#[derive(Debug, Deserialize)]
struct RawSystemConfig {
    #[serde(default)]
    log_config: LogConfig,
}

/// Folder rules plus the logging section of the system file.
#[derive(Debug, Clone)]
pub struct SystemConfig {
    pub rules: RuleConfig,
    pub log: LogConfig,
}

impl SystemConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read system config {}", path.display()))?;
        Self::from_json_str(&raw)
            .with_context(|| format!("invalid system config {}", path.display()))
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let rules = RuleConfig::from_json_str(raw)?;
        let parsed: RawSystemConfig = serde_json::from_str(raw)?;
        Ok(Self {
            rules,
            log: parsed.log_config,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserConfig {
    pub team: Team,
    pub base_dir: PathBuf,
    /// `cover` replaces the checklist from the template; anything else
    /// fills the existing one.
    pub checklist: String,
    #[serde(default = "default_templates_dir")]
    pub templates_dir: PathBuf,
    #[serde(default = "default_signs_dir")]
    pub signs_dir: PathBuf,
    #[serde(default = "default_activex_cache")]
    pub activex_cache: PathBuf,
    /// Task field name to zero-based column of the task sheet. Header names
    /// are used when empty.
    #[serde(default)]
    pub task_list_map: IndexMap<String, usize>,
}

fn default_templates_dir() -> PathBuf {
    PathBuf::from("templates")
}

fn default_signs_dir() -> PathBuf {
    PathBuf::from("signs")
}

fn default_activex_cache() -> PathBuf {
    PathBuf::from("activex_config.json")
}

impl UserConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read user config {}", path.display()))?;
        let mut config: UserConfig = serde_json::from_str(&raw)
            .with_context(|| format!("invalid user config {}", path.display()))?;
        config.apply_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    /// Applies `EFILING_TEAM` and `EFILING_BASE_DIR` from `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(team) = lookup("EFILING_TEAM").filter(|value| !value.trim().is_empty()) {
            self.team = team
                .parse()
                .map_err(|err| anyhow!("EFILING_TEAM: {err}"))?;
        }
        if let Some(base_dir) = lookup("EFILING_BASE_DIR").filter(|value| !value.trim().is_empty())
        {
            self.base_dir = PathBuf::from(base_dir.trim());
        }
        Ok(())
    }

    pub fn policy(&self) -> ChecklistPolicy {
        ChecklistPolicy::from_setting(&self.checklist)
    }
}
