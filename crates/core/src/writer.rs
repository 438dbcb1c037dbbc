use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tracing::{debug, error, info};

use crate::cache::LazyCache;
use crate::checklist::{resolve_document, ChecklistPolicy};
use crate::document::{Automation, Document, DocumentEditor};
use crate::error::{EfilingError, Result};
use crate::fields::{write_fields, FieldContext};
use crate::process::ProcessTerminator;
use crate::rules::{FileMap, RuleConfig, TableSpec};
use crate::status::FolderStatus;
use crate::task::Task;
use crate::team::Team;
use crate::toggle::{ToggleLookup, ToggleReport};

#[derive(Debug, Clone)]
pub struct WriterSettings {
    pub team: Team,
    pub tables: Vec<TableSpec>,
    pub file_map: FileMap,
    pub policy: ChecklistPolicy,
    pub templates_dir: PathBuf,
    pub signs_dir: PathBuf,
    pub cache: Option<Arc<LazyCache>>,
}

impl WriterSettings {
    pub fn from_rules(
        team: Team,
        rules: &RuleConfig,
        policy: ChecklistPolicy,
        templates_dir: impl Into<PathBuf>,
        signs_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        Ok(Self {
            team,
            tables: rules.tables(team)?.to_vec(),
            file_map: rules.file_map().clone(),
            policy,
            templates_dir: templates_dir.into(),
            signs_dir: signs_dir.into(),
            cache: None,
        })
    }

    pub fn with_cache(mut self, cache: Arc<LazyCache>) -> Self {
        self.cache = Some(cache);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct WriteOutcome {
    pub document: PathBuf,
    pub fields_written: usize,
    pub toggles: ToggleReport,
    pub statuses: Vec<(usize, FolderStatus)>,
}

pub struct ChecklistWriter<A, T> {
    automation: A,
    terminator: T,
    settings: WriterSettings,
    today: Option<NaiveDate>,
}

impl<A, T> ChecklistWriter<A, T>
where
    A: Automation,
    T: ProcessTerminator,
{
    pub fn new(automation: A, terminator: T, settings: WriterSettings) -> Self {
        Self {
            automation,
            terminator,
            settings,
            today: None,
        }
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn settings(&self) -> &WriterSettings {
        &self.settings
    }

    pub fn terminator(&self) -> &T {
        &self.terminator
    }

    pub fn run(&self, task: &Task, working_dir: &Path) -> Result<WriteOutcome> {
        let result = self
            .automation
            .open_application()
            .and_then(|mut editor| {
                let outcome = self.fill(&mut editor, task, working_dir)?;
                editor.quit()?;
                Ok(outcome)
            });
        match result {
            Ok(outcome) => {
                info!(
                    job_no = %task.job_no,
                    document = %outcome.document.display(),
                    fields = outcome.fields_written,
                    toggles_written = outcome.toggles.written,
                    toggles_unchanged = outcome.toggles.unchanged,
                    toggles_skipped = outcome.toggles.skipped,
                    "checklist written"
                );
                Ok(outcome)
            }
            Err(err) => {
                error!(job_no = %task.job_no, dir = %working_dir.display(), "checklist write aborted: {err}");
                self.terminator.kill_all();
                Err(err)
            }
        }
    }

    fn fill(
        &self,
        editor: &mut A::Editor,
        task: &Task,
        working_dir: &Path,
    ) -> Result<WriteOutcome> {
        let settings = &self.settings;
        let team = settings.team;
        let path = resolve_document(
            working_dir,
            settings.policy,
            team,
            &settings.templates_dir,
        )?;
        debug!(document = %path.display(), "document resolved");

        let mut doc = editor.open_document(&path)?;
        let found = doc.table_count()?;
        if found < settings.tables.len() {
            return Err(EfilingError::TableCountMismatch {
                expected: settings.tables.len(),
                found,
            });
        }

        let cache = settings.cache.as_deref().map(LazyCache::get);
        let ctx = FieldContext {
            signs_dir: &settings.signs_dir,
            today: self.today.unwrap_or_else(|| Local::now().date_naive()),
        };
        let mut outcome = WriteOutcome {
            document: path,
            ..WriteOutcome::default()
        };
        for (index, spec) in settings.tables.iter().enumerate() {
            let table = doc.table(index)?;
            if let Some(fields) = &spec.fields {
                outcome.fields_written += write_fields(&table, task, fields, &ctx)?;
            }
            if let Some(options) = &spec.options {
                let status = team.evaluate(working_dir, options, &settings.file_map)?;
                let lookup = ToggleLookup {
                    template: team.template_name(),
                    table_index: index,
                    cache,
                };
                let report = team.write_options(&table, &lookup, &status, options)?;
                outcome.toggles.written += report.written;
                outcome.toggles.unchanged += report.unchanged;
                outcome.toggles.skipped += report.skipped;
                outcome.statuses.push((index, status));
            }
            debug!(table = index, "table written");
        }

        doc.save()
            .map_err(|err| err.with_locked_path(&outcome.document))?;
        doc.close()?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryAutomation, TableLayout};
    use crate::rules::{OptionSpec, OptionsSpec};
    use std::cell::Cell;
    use std::fs;
    use tempfile::tempdir;

    #[derive(Default)]
    struct CountingTerminator {
        calls: Cell<usize>,
    }

    impl ProcessTerminator for CountingTerminator {
        fn kill_all(&self) {
            self.calls.set(self.calls.get() + 1);
        }
    }

    fn settings(templates: &Path, signs: &Path, tables: Vec<TableSpec>) -> WriterSettings {
        WriterSettings {
            team: Team::General,
            tables,
            file_map: FileMap::new(),
            policy: ChecklistPolicy::Cover,
            templates_dir: templates.to_path_buf(),
            signs_dir: signs.to_path_buf(),
            cache: None,
        }
    }

    #[test]
    fn missing_template_aborts_and_kills() {
        let job = tempdir().unwrap();
        let templates = tempdir().unwrap();
        let automation = MemoryAutomation::new();
        let writer = ChecklistWriter::new(
            automation.clone(),
            CountingTerminator::default(),
            settings(templates.path(), templates.path(), vec![TableSpec::default()]),
        );
        let err = writer.run(&Task::new("J1"), job.path()).unwrap_err();
        assert!(matches!(err, EfilingError::TemplateNotFound(_)));
        assert_eq!(writer.terminator().calls.get(), 1);
        assert_eq!(automation.launches(), 1);
        assert_eq!(automation.quits(), 0);
    }

    #[test]
    fn presence_options_are_written_and_document_saved() {
        let job = tempdir().unwrap();
        fs::create_dir_all(job.path().join("Photos")).unwrap();
        fs::write(job.path().join("Photos").join("front.jpg"), "x").unwrap();
        let templates = tempdir().unwrap();
        fs::write(templates.path().join("general_template.docx"), "t").unwrap();

        let automation = MemoryAutomation::new();
        automation.set_fallback(vec![TableLayout::new(5, 3)
            .with_toggle(2, 3)
            .with_toggle(3, 3)]);
        let mut options = OptionsSpec::new();
        options.insert("Photos".into(), OptionSpec::Presence(2));
        options.insert("Drawings".into(), OptionSpec::Presence(3));
        let tables = vec![TableSpec {
            fields: None,
            options: Some(options),
        }];
        let writer = ChecklistWriter::new(
            automation.clone(),
            CountingTerminator::default(),
            settings(templates.path(), templates.path(), tables),
        );

        let outcome = writer.run(&Task::new("J1"), job.path()).unwrap();
        let table = automation.table(&outcome.document, 0).unwrap();
        assert_eq!(table.toggle_values_at(2, 3), vec![true, false]);
        assert_eq!(table.toggle_values_at(3, 3), vec![false, true]);
        assert_eq!(automation.saves(&outcome.document), 1);
        assert!(automation.is_closed(&outcome.document));
        assert_eq!(automation.quits(), 1);
        assert_eq!(writer.terminator().calls.get(), 0);
    }
}
