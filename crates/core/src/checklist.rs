use std::fs;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::{EfilingError, Result};
use crate::team::Team;

pub const CHECKLIST_FILE_NAME: &str = "E-filing checklist.docx";
const IGNORED_PREFIXES: [&str; 3] = ["~$", ".", "__"];
const NAME_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

static CHECKLIST_PATTERN: Lazy<Pattern> =
    Lazy::new(|| Pattern::new("*checklist*.doc*").expect("valid checklist pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecklistPolicy {
    Cover,
    UseExisting,
}

impl ChecklistPolicy {
    pub fn from_setting(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("cover") {
            ChecklistPolicy::Cover
        } else {
            ChecklistPolicy::UseExisting
        }
    }
}

pub fn find_checklists(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if IGNORED_PREFIXES.iter().any(|prefix| name.starts_with(prefix)) {
            continue;
        }
        if CHECKLIST_PATTERN.matches_with(&name, NAME_OPTIONS) && entry.path().is_file() {
            found.push(entry.path());
        }
    }
    found.sort();
    Ok(found)
}

pub fn resolve_document(
    working_dir: &Path,
    policy: ChecklistPolicy,
    team: Team,
    templates_dir: &Path,
) -> Result<PathBuf> {
    let existing = find_checklists(working_dir)?;
    match policy {
        ChecklistPolicy::Cover => {
            let template = templates_dir.join(team.template_file_name());
            if !template.is_file() {
                return Err(EfilingError::TemplateNotFound(template));
            }
            for path in &existing {
                fs::remove_file(path)?;
                info!(path = %path.display(), "removed existing checklist");
            }
            let target = working_dir.join(CHECKLIST_FILE_NAME);
            fs::copy(&template, &target)?;
            info!(path = %target.display(), "copied checklist template");
            Ok(target)
        }
        ChecklistPolicy::UseExisting => {
            let mut existing = existing.into_iter();
            let first = existing
                .next()
                .ok_or_else(|| EfilingError::ChecklistNotFound(working_dir.to_path_buf()))?;
            let extra = existing.count();
            if extra > 0 {
                error!(
                    dir = %working_dir.display(),
                    using = %first.display(),
                    "found {} checklist documents, only the first will be filled",
                    extra + 1
                );
            }
            Ok(first)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn templates() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("general_template.docx"), "template").unwrap();
        dir
    }

    #[test]
    fn find_ignores_lock_and_temp_files() {
        let dir = tempdir().unwrap();
        for name in [
            "~$E-filing checklist.docx",
            ".checklist.docx",
            "__checklist.doc",
            "Job Checklist.doc",
            "notes.docx",
        ] {
            fs::write(dir.path().join(name), "x").unwrap();
        }
        let found = find_checklists(dir.path()).unwrap();
        assert_eq!(found, vec![dir.path().join("Job Checklist.doc")]);
    }

    #[test]
    fn cover_replaces_existing_and_is_stable_on_rerun() {
        let dir = tempdir().unwrap();
        let templates = templates();
        fs::write(dir.path().join("old checklist.docx"), "old").unwrap();

        let first = resolve_document(
            dir.path(),
            ChecklistPolicy::Cover,
            Team::General,
            templates.path(),
        )
        .unwrap();
        assert_eq!(first, dir.path().join(CHECKLIST_FILE_NAME));
        assert!(!dir.path().join("old checklist.docx").exists());
        assert_eq!(fs::read_to_string(&first).unwrap(), "template");

        let second = resolve_document(
            dir.path(),
            ChecklistPolicy::Cover,
            Team::General,
            templates.path(),
        )
        .unwrap();
        assert_eq!(first, second);
        assert_eq!(find_checklists(dir.path()).unwrap(), vec![second]);
    }

    #[test]
    fn cover_without_template_fails() {
        let dir = tempdir().unwrap();
        let templates = templates();
        let err = resolve_document(dir.path(), ChecklistPolicy::Cover, Team::Ppt, templates.path())
            .unwrap_err();
        assert!(matches!(err, EfilingError::TemplateNotFound(_)));
    }

    #[test]
    fn existing_policy_picks_first_sorted_match() {
        let dir = tempdir().unwrap();
        let templates = templates();
        fs::write(dir.path().join("b checklist.docx"), "b").unwrap();
        fs::write(dir.path().join("a checklist.docx"), "a").unwrap();
        let picked = resolve_document(
            dir.path(),
            ChecklistPolicy::UseExisting,
            Team::General,
            templates.path(),
        )
        .unwrap();
        assert_eq!(picked, dir.path().join("a checklist.docx"));
        assert!(dir.path().join("b checklist.docx").exists());
    }

    #[test]
    fn existing_policy_without_checklist_fails() {
        let dir = tempdir().unwrap();
        let templates = templates();
        let err = resolve_document(
            dir.path(),
            ChecklistPolicy::UseExisting,
            Team::General,
            templates.path(),
        )
        .unwrap_err();
        assert!(matches!(err, EfilingError::ChecklistNotFound(_)));
    }

    #[test]
    fn policy_setting_parses_cover_only() {
        assert_eq!(ChecklistPolicy::from_setting("Cover"), ChecklistPolicy::Cover);
        assert_eq!(
            ChecklistPolicy::from_setting("keep"),
            ChecklistPolicy::UseExisting
        );
    }
}
