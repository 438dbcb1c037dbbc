use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

pub trait PathResolver {
    fn resolve(&self, job_no: &str) -> Option<PathBuf>;
}

#[derive(Debug, Clone)]
pub struct YearFolderResolver {
    base_dir: PathBuf,
}

impl YearFolderResolver {
    pub const MIN_JOB_NO_LEN: usize = 8;

    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

impl PathResolver for YearFolderResolver {
    fn resolve(&self, job_no: &str) -> Option<PathBuf> {
        let job_no = job_no.trim();
        if job_no.chars().count() < Self::MIN_JOB_NO_LEN {
            debug!(job_no, "job number too short");
            return None;
        }
        let year: String = job_no.chars().take(2).collect();
        let search_dir = self.base_dir.join(format!("20{year}"));
        let mut candidates: Vec<PathBuf> = match fs::read_dir(&search_dir) {
            Ok(entries) => entries
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.path().is_dir())
                .filter(|entry| entry.file_name().to_string_lossy().starts_with(job_no))
                .map(|entry| entry.path())
                .collect(),
            Err(err) => {
                debug!(dir = %search_dir.display(), "cannot read year folder: {err}");
                return None;
            }
        };
        candidates.sort();
        let found = candidates.into_iter().next();
        if found.is_none() {
            debug!(dir = %search_dir.display(), job_no, "no folder starts with job number");
        }
        found
    }
}

#[derive(Debug, Clone)]
pub struct SymlinkResolver {
    shortcuts_dir: PathBuf,
}

impl SymlinkResolver {
    pub fn new(shortcuts_dir: impl Into<PathBuf>) -> Self {
        Self {
            shortcuts_dir: shortcuts_dir.into(),
        }
    }
}

impl PathResolver for SymlinkResolver {
    fn resolve(&self, job_no: &str) -> Option<PathBuf> {
        let prefix = job_no.trim().to_lowercase();
        if prefix.is_empty() {
            return None;
        }
        let mut links: Vec<PathBuf> = fs::read_dir(&self.shortcuts_dir)
            .ok()?
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry
                    .file_name()
                    .to_string_lossy()
                    .to_lowercase()
                    .starts_with(&prefix)
            })
            .map(|entry| entry.path())
            .filter(|path| path.is_symlink())
            .collect();
        links.sort();
        let link = links.into_iter().next()?;
        match fs::read_link(&link) {
            Ok(target) => Some(target),
            Err(err) => {
                debug!(link = %link.display(), "unreadable link: {err}");
                None
            }
        }
    }
}

pub fn is_broken_target(path: &Path) -> bool {
    path.as_os_str().to_string_lossy().trim() == "."
}
