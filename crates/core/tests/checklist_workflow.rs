use std::cell::Cell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use chrono::NaiveDate;
use efiling_core::memory::{MemoryAutomation, TableLayout};
use efiling_core::{
    BatchContext, BatchRunner, ChecklistPolicy, ChecklistWriter, CoordinateCache, EfilingError,
    JobStatus, LazyCache, ProcessTerminator, RuleConfig, Task, Team, WriterSettings,
    YearFolderResolver, CHECKLIST_FILE_NAME,
};
use serde_json::json;
use tempfile::{tempdir, TempDir};

const JOB_NO: &str = "250100032HZH";

const RULES: &str = r#"{
    "subFolderConfig": {
        "general": [
            {
                "fields": {
                    "job_no": {"indexes": [2, 2]},
                    "job_creator": {"indexes": [2, 4]},
                    "engineers": {"indexes": [3, 2], "type": "image"},
                    "date": {"indexes": [4, 2], "type": "date"}
                },
                "options": {
                    "1 Application documents": {"GS": 9, "CB": 10, "ETL": 11}
                }
            }
        ]
    },
    "file_map": {
        "GS": ["*GS*.pdf"],
        "CB": ["*CB*.pdf", "*CB*.zip"],
        "ETL": ["*ETL*.pdf"]
    }
}"#;

#[derive(Clone, Default)]
struct CountingTerminator {
    calls: Rc<Cell<usize>>,
}

impl ProcessTerminator for CountingTerminator {
    fn kill_all(&self) {
        self.calls.set(self.calls.get() + 1);
    }
}

struct Fixture {
    base: TempDir,
    templates: TempDir,
    signs: TempDir,
    job_dir: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let base = tempdir().unwrap();
        let job_dir = base.path().join("2025").join(format!("{JOB_NO}_Shangyu Shunhe"));
        let docs = job_dir.join("1 Application documents");
        fs::create_dir_all(&docs).unwrap();
        fs::write(docs.join("Luminaire GS report.pdf"), "pdf").unwrap();
        fs::write(docs.join("notes.txt"), "txt").unwrap();

        let templates = tempdir().unwrap();
        fs::write(templates.path().join("general_template.docx"), "template").unwrap();
        let signs = tempdir().unwrap();
        fs::write(signs.path().join("Y.jpg"), "jpg").unwrap();
        Self {
            base,
            templates,
            signs,
            job_dir,
        }
    }

    fn settings(&self, rules: &str) -> WriterSettings {
        self.settings_with(rules, ChecklistPolicy::Cover)
    }

    fn settings_with(&self, rules: &str, policy: ChecklistPolicy) -> WriterSettings {
        let rules = RuleConfig::from_json_str(rules).unwrap();
        WriterSettings::from_rules(
            Team::General,
            &rules,
            policy,
            self.templates.path(),
            self.signs.path(),
        )
        .unwrap()
    }

    fn checklist(&self) -> PathBuf {
        self.job_dir.join(CHECKLIST_FILE_NAME)
    }
}

fn checklist_layout() -> TableLayout {
    TableLayout::new(12, 4)
        .with_toggle(9, 3)
        .with_toggle(10, 3)
        .with_toggle(11, 3)
}

fn task() -> Task {
    Task::new(JOB_NO)
        .with_field("job_creator", "X")
        .with_field("engineers", "Y")
}

fn runner(
    fixture: &Fixture,
    automation: &MemoryAutomation,
    terminator: &CountingTerminator,
    settings: WriterSettings,
) -> BatchRunner<MemoryAutomation, CountingTerminator, YearFolderResolver> {
    let writer = ChecklistWriter::new(automation.clone(), terminator.clone(), settings)
        .with_today(NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
    BatchRunner::new(
        writer,
        YearFolderResolver::new(fixture.base.path()),
        Arc::new(BatchContext::new()),
    )
}

#[test]
fn fills_fields_and_options_for_one_job() {
    let fixture = Fixture::new();
    let automation = MemoryAutomation::new();
    automation.set_fallback(vec![checklist_layout()]);
    let terminator = CountingTerminator::default();
    let runner = runner(&fixture, &automation, &terminator, fixture.settings(RULES));

    let summary = runner.run(&[task()]).unwrap();
    assert_eq!(summary.completed, 1);
    assert!(!summary.cancelled);

    let record = runner.context().record(JOB_NO).unwrap();
    assert_eq!(record.status, JobStatus::Completed);
    assert_eq!(record.job_creator, "X");
    assert_eq!(
        record.folders,
        json!({"table_0": {"1 Application documents": {"GS": true, "CB": false, "ETL": false}}})
    );
    assert!(record.logs.len() >= 3);

    let checklist = fixture.checklist();
    let table = automation.table(&checklist, 0).unwrap();
    assert_eq!(table.toggle_values_at(9, 3), vec![true, false]);
    assert_eq!(table.toggle_values_at(10, 3), vec![false, true]);
    assert_eq!(table.toggle_values_at(11, 3), vec![false, true]);
    assert_eq!(table.text_at(2, 2).as_deref(), Some(JOB_NO));
    assert_eq!(table.text_at(2, 4).as_deref(), Some("X"));
    assert_eq!(table.text_at(4, 2).as_deref(), Some("2026-10-18"));
    assert_eq!(table.images_at(3, 2)[0].path, fixture.signs.path().join("Y.jpg"));
    assert_eq!(automation.saves(&checklist), 1);
    assert!(automation.is_closed(&checklist));
    // once before the write, never for cleanup
    assert_eq!(terminator.calls.get(), 1);
}

fn files_in(dir: &Path) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .count()
}

#[test]
fn rerun_on_existing_checklist_leaves_toggles_untouched() {
    let fixture = Fixture::new();
    fs::write(fixture.checklist(), "template").unwrap();
    let automation = MemoryAutomation::new();
    automation.set_fallback(vec![checklist_layout()]);
    let terminator = CountingTerminator::default();
    let settings = fixture.settings_with(RULES, ChecklistPolicy::UseExisting);
    let runner = runner(&fixture, &automation, &terminator, settings);

    runner.run(&[task()]).unwrap();
    let stats = automation.stats(&fixture.checklist()).unwrap();

    let record = runner.rerun(&task()).unwrap();
    assert_eq!(record.status, JobStatus::Completed);
    assert_eq!(runner.context().snapshot().len(), 1);
    let after = automation.stats(&fixture.checklist()).unwrap();
    assert_eq!(after.toggle_writes, stats.toggle_writes);
    assert_eq!(automation.saves(&fixture.checklist()), 2);
    assert_eq!(files_in(&fixture.job_dir), 1);
}

#[test]
fn cover_rerun_fills_a_fresh_template_copy() {
    let fixture = Fixture::new();
    let automation = MemoryAutomation::new();
    automation.set_fallback(vec![checklist_layout()]);
    let terminator = CountingTerminator::default();
    let runner = runner(&fixture, &automation, &terminator, fixture.settings(RULES));

    runner.run(&[task()]).unwrap();
    let first = automation.table(&fixture.checklist(), 0).unwrap();
    assert_eq!(first.images_at(3, 2).len(), 1);

    let record = runner.rerun(&task()).unwrap();
    assert_eq!(record.status, JobStatus::Completed);
    assert_eq!(runner.context().snapshot().len(), 1);

    let table = automation.table(&fixture.checklist(), 0).unwrap();
    assert_eq!(table.images_at(3, 2).len(), 1);
    assert_eq!(table.images_at(3, 2)[0].path, fixture.signs.path().join("Y.jpg"));
    assert_eq!(table.toggle_values_at(9, 3), vec![true, false]);
    assert_eq!(table.toggle_values_at(10, 3), vec![false, true]);
    let stats = automation.stats(&fixture.checklist()).unwrap();
    assert!(stats.toggle_writes > 0);
    assert_eq!(stats.image_inserts, 1);
    assert_eq!(automation.saves(&fixture.checklist()), 1);
    assert_eq!(files_in(&fixture.job_dir), 1);
}

#[test]
fn unresolvable_jobs_are_recorded_and_the_batch_continues() {
    let fixture = Fixture::new();
    let automation = MemoryAutomation::new();
    automation.set_fallback(vec![checklist_layout()]);
    let terminator = CountingTerminator::default();
    let runner = runner(&fixture, &automation, &terminator, fixture.settings(RULES));

    let summary = runner
        .run(&[Task::new("250100099HZH"), Task::new("2501"), task()])
        .unwrap();
    assert_eq!(summary.total, 3);
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.completed, 1);
    let store = runner.context().snapshot();
    assert_eq!(store.records()[0].status, JobStatus::NotFound);
    assert_eq!(store.records()[1].status, JobStatus::NotFound);
    assert_eq!(store.records()[2].status, JobStatus::Completed);
}

#[test]
fn locked_document_reports_no_write_permission() {
    let fixture = Fixture::new();
    let automation = MemoryAutomation::new();
    automation.set_fallback(vec![checklist_layout()]);
    automation.fail_saves_with(io::ErrorKind::PermissionDenied);
    let terminator = CountingTerminator::default();
    let runner = runner(&fixture, &automation, &terminator, fixture.settings(RULES));

    let summary = runner.run(&[task()]).unwrap();
    assert_eq!(summary.failed, 1);
    let record = runner.context().record(JOB_NO).unwrap();
    assert_eq!(record.status, JobStatus::NoWritePermission);
    let last = &record.logs.last().unwrap().message;
    assert!(last.contains(CHECKLIST_FILE_NAME), "{last}");
    // before the write and again after the failed save
    assert_eq!(terminator.calls.get(), 2);
    assert_eq!(automation.quits(), 0);
}

#[test]
fn table_count_mismatch_stops_the_batch() {
    let fixture = Fixture::new();
    let automation = MemoryAutomation::new();
    automation.set_fallback(vec![checklist_layout()]);
    let terminator = CountingTerminator::default();
    let two_tables = RULES.replacen(
        r#""general": ["#,
        r#""general": [{"options": {"Extra": 2}},"#,
        1,
    );
    let runner = runner(&fixture, &automation, &terminator, fixture.settings(&two_tables));

    let err = runner.run(&[task(), task()]).unwrap_err();
    assert!(matches!(
        err,
        EfilingError::TableCountMismatch {
            expected: 2,
            found: 1
        }
    ));
    let store = runner.context().snapshot();
    assert_eq!(store.len(), 1);
    assert_eq!(store.records()[0].status, JobStatus::Failed);
    assert_eq!(terminator.calls.get(), 2);
}

#[test]
fn stale_cache_entries_fall_back_to_a_row_scan() {
    let fixture = Fixture::new();
    let automation = MemoryAutomation::new();
    automation.set_fallback(vec![checklist_layout()]);
    let terminator = CountingTerminator::default();
    let cache = CoordinateCache::from_json_str(
        r#"{"general_template": {
            "table_0": {
                "9": {"row": 9, "column": 3},
                "10": {"row": 10, "column": 1},
                "11": {"row": 8, "column": 3}
            }
        }}"#,
    )
    .unwrap();
    let settings = fixture
        .settings(RULES)
        .with_cache(Arc::new(LazyCache::preloaded(cache)));
    let runner = runner(&fixture, &automation, &terminator, settings);

    runner.run(&[task()]).unwrap();
    let table = automation.table(&fixture.checklist(), 0).unwrap();
    assert_eq!(table.toggle_values_at(9, 3), vec![true, false]);
    assert_eq!(table.toggle_values_at(10, 3), vec![false, true]);
    assert_eq!(table.toggle_values_at(11, 3), vec![false, true]);
}

#[test]
fn cancelled_batch_processes_nothing() {
    let fixture = Fixture::new();
    let automation = MemoryAutomation::new();
    automation.set_fallback(vec![checklist_layout()]);
    let terminator = CountingTerminator::default();
    let runner = runner(&fixture, &automation, &terminator, fixture.settings(RULES));

    runner.context().cancel_token().cancel();
    let summary = runner.run(&[task()]).unwrap();
    assert!(summary.cancelled);
    assert!(runner.context().snapshot().is_empty());
    assert_eq!(automation.launches(), 0);
    assert!(!fixture.checklist().exists());
}
