use std::path::{Path, PathBuf};

use glob::MatchOptions;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{EfilingError, Result};
use crate::rules::{FileMap, OptionSpec, OptionsSpec};
use crate::team::Team;

const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FolderEntry {
    Present(bool),
    Rules(IndexMap<String, bool>),
}

impl FolderEntry {
    pub fn presence(&self) -> Option<bool> {
        match self {
            FolderEntry::Present(value) => Some(*value),
            FolderEntry::Rules(_) => None,
        }
    }

    pub fn rule(&self, key: &str) -> Option<bool> {
        match self {
            FolderEntry::Present(value) => Some(*value),
            FolderEntry::Rules(rules) => rules.get(key).copied(),
        }
    }

    pub fn all_passed(&self) -> bool {
        match self {
            FolderEntry::Present(value) => *value,
            FolderEntry::Rules(rules) => rules.values().all(|value| *value),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderStatus {
    entries: IndexMap<String, FolderEntry>,
}

impl FolderStatus {
    pub fn get(&self, folder: &str) -> Option<&FolderEntry> {
        self.entries.get(folder)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FolderEntry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn all_passed(&self) -> bool {
        self.entries.values().all(FolderEntry::all_passed)
    }

    fn insert(&mut self, folder: &str, entry: FolderEntry) {
        self.entries.insert(folder.to_string(), entry);
    }
}

impl FromIterator<(String, FolderEntry)> for FolderStatus {
    fn from_iter<I: IntoIterator<Item = (String, FolderEntry)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl Team {
    pub fn evaluate(
        &self,
        working_dir: &Path,
        options: &OptionsSpec,
        file_map: &FileMap,
    ) -> Result<FolderStatus> {
        match self {
            Team::General => Ok(evaluate_general(working_dir, options, file_map)),
            Team::Ppt => evaluate_strict(working_dir, options),
        }
    }
}

pub fn evaluate_general(working_dir: &Path, options: &OptionsSpec, file_map: &FileMap) -> FolderStatus {
    evaluate_general_with(working_dir, options, file_map, pattern_matches)
}

fn evaluate_general_with<F>(
    working_dir: &Path,
    options: &OptionsSpec,
    file_map: &FileMap,
    mut matcher: F,
) -> FolderStatus
where
    F: FnMut(&Path, &str) -> bool,
{
    let mut status = FolderStatus::default();
    if !working_dir.is_dir() {
        warn!(
            dir = %working_dir.display(),
            "working folder is not a directory; every entry resolves to false"
        );
    }
    for (folder, spec) in options {
        let sub_path = subfolder_path(working_dir, folder);
        if !sub_path.exists() {
            warn!(folder = %folder, path = %sub_path.display(), "subfolder not found");
            status.insert(folder, FolderEntry::Present(false));
            continue;
        }
        match spec {
            OptionSpec::Presence(_) => {
                let present = has_any_file(&sub_path);
                debug!(folder = %folder, present, "presence check");
                status.insert(folder, FolderEntry::Present(present));
            }
            OptionSpec::Rules(rules) => {
                let mut results = IndexMap::with_capacity(rules.len());
                for key in rules.keys() {
                    let found = match file_map.get(key) {
                        Some(patterns) => patterns
                            .iter()
                            .filter(|pattern| !pattern.trim().is_empty())
                            .any(|pattern| matcher(&sub_path, pattern.as_str())),
                        None => {
                            warn!(folder = %folder, rule = %key, "rule key absent from file map");
                            false
                        }
                    };
                    debug!(folder = %folder, rule = %key, found, "rule check");
                    results.insert(key.clone(), found);
                }
                status.insert(folder, FolderEntry::Rules(results));
            }
        }
    }
    status
}

pub fn evaluate_strict(working_dir: &Path, options: &OptionsSpec) -> Result<FolderStatus> {
    let mut status = FolderStatus::default();
    for folder in options.keys() {
        let sub_path = subfolder_path(working_dir, folder);
        if !sub_path.exists() {
            return Err(EfilingError::MissingSubfolder(sub_path));
        }
        let present = has_any_file(&sub_path);
        debug!(folder = %folder, present, "presence check");
        status.insert(folder, FolderEntry::Present(present));
    }
    Ok(status)
}

pub fn subfolder_path(working_dir: &Path, key: &str) -> PathBuf {
    key.split(['\\', '/'])
        .filter(|segment| !segment.is_empty())
        .fold(working_dir.to_path_buf(), |path, segment| path.join(segment))
}

pub fn has_any_file(path: &Path) -> bool {
    WalkDir::new(path)
        .min_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .any(|entry| {
            entry.file_type().is_file() || (entry.path_is_symlink() && !entry.path().is_dir())
        })
}

pub fn pattern_matches(dir: &Path, pattern: &str) -> bool {
    let full = format!(
        "{}/{}",
        glob::Pattern::escape(&dir.to_string_lossy()),
        pattern
    );
    match glob::glob_with(&full, GLOB_OPTIONS) {
        Ok(mut paths) => paths.any(|entry| entry.is_ok()),
        Err(err) => {
            warn!(pattern = %pattern, "invalid file pattern: {}", err.msg);
            false
        }
    }
}
