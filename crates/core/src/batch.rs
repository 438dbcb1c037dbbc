use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use efiling_report::{JobRecord, JobStatus, ResultStore};
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use crate::document::Automation;
use crate::error::{EfilingError, FaultCategory, Result};
use crate::locate::{is_broken_target, PathResolver};
use crate::precheck::precheck;
use crate::process::ProcessTerminator;
use crate::task::Task;
use crate::writer::{ChecklistWriter, WriteOutcome};

#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
pub struct BatchContext {
    store: Mutex<ResultStore>,
    cancel: CancelToken,
}

impl BatchContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn snapshot(&self) -> ResultStore {
        self.store().clone()
    }

    pub fn record(&self, job_no: &str) -> Option<JobRecord> {
        self.store().get_by_job_no(job_no).cloned()
    }

    fn store(&self) -> MutexGuard<'_, ResultStore> {
        self.store
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cancelled: bool,
}

enum JobEnd {
    Finished,
    Cancelled,
}

pub struct BatchRunner<A, T, R> {
    writer: ChecklistWriter<A, T>,
    resolver: R,
    context: Arc<BatchContext>,
}

impl<A, T, R> BatchRunner<A, T, R>
where
    A: Automation,
    T: ProcessTerminator,
    R: PathResolver,
{
    pub fn new(writer: ChecklistWriter<A, T>, resolver: R, context: Arc<BatchContext>) -> Self {
        Self {
            writer,
            resolver,
            context,
        }
    }

    pub fn context(&self) -> &Arc<BatchContext> {
        &self.context
    }

    pub fn run(&self, tasks: &[Task]) -> Result<BatchSummary> {
        self.context.store().clear();
        let mut summary = BatchSummary {
            total: tasks.len(),
            ..BatchSummary::default()
        };
        info!(jobs = tasks.len(), team = %self.writer.settings().team, "batch started");
        for (index, task) in tasks.iter().enumerate() {
            if self.context.cancel.is_cancelled() {
                info!(done = index, total = tasks.len(), "batch cancelled");
                summary.cancelled = true;
                break;
            }
            info!(job_no = %task.job_no, "job {}/{}", index + 1, tasks.len());
            let mut record = new_record(task);
            let outcome = self.process(task, &mut record);
            let status = record.status;
            self.context.store().add(record);
            match outcome? {
                JobEnd::Cancelled => {
                    summary.cancelled = true;
                    break;
                }
                JobEnd::Finished => match status {
                    JobStatus::Completed => summary.completed += 1,
                    JobStatus::Failed | JobStatus::NoWritePermission => summary.failed += 1,
                    _ => summary.skipped += 1,
                },
            }
        }
        info!(
            completed = summary.completed,
            failed = summary.failed,
            skipped = summary.skipped,
            cancelled = summary.cancelled,
            "batch finished"
        );
        Ok(summary)
    }

    pub fn rerun(&self, task: &Task) -> Result<JobRecord> {
        info!(job_no = %task.job_no, "rerunning job");
        let mut record = new_record(task);
        let outcome = self.process(task, &mut record);
        {
            let mut store = self.context.store();
            if !store.update_by_job_no(record.clone()) {
                store.add(record.clone());
            }
        }
        outcome.map(|_| record)
    }

    fn process(&self, task: &Task, record: &mut JobRecord) -> Result<JobEnd> {
        let cancel = &self.context.cancel;
        let Some(working_dir) = self.resolver.resolve(&task.job_no) else {
            warn!(job_no = %task.job_no, "job folder not found");
            finish(record, JobStatus::NotFound, "job folder not found");
            return Ok(JobEnd::Finished);
        };
        if is_broken_target(&working_dir) {
            warn!(job_no = %task.job_no, "job shortcut is broken");
            finish(record, JobStatus::BrokenShortcut, "job shortcut points nowhere");
            return Ok(JobEnd::Finished);
        }
        record.target_path = Some(working_dir.display().to_string());
        record.log(format!("resolved to {}", working_dir.display()));

        let settings = self.writer.settings();
        if !precheck(&working_dir, settings.team, &settings.tables) {
            finish(record, JobStatus::PreconditionFailed, "folder precheck failed");
            return Ok(JobEnd::Finished);
        }
        record.log("precheck passed");

        if cancel.is_cancelled() {
            record.log("cancelled before cleanup");
            return Ok(JobEnd::Cancelled);
        }
        self.writer.terminator().kill_all();
        if cancel.is_cancelled() {
            record.log("cancelled before write");
            return Ok(JobEnd::Cancelled);
        }

        record.log("writing checklist");
        match self.writer.run(task, &working_dir) {
            Ok(outcome) => {
                record.folders = folders_value(&outcome);
                finish(record, JobStatus::Completed, "checklist written");
                Ok(JobEnd::Finished)
            }
            Err(err) => settle_failure(record, &working_dir, err),
        }
    }
}

fn new_record(task: &Task) -> JobRecord {
    let mut record = JobRecord::new(task.job_no.clone(), JobStatus::Processing);
    record.job_creator = task.job_creator.clone().unwrap_or_default();
    record.engineers = task.engineers.clone().unwrap_or_default();
    record.log("queued");
    record
}

fn finish(record: &mut JobRecord, status: JobStatus, message: &str) {
    record.status = status;
    record.log(message);
}

fn settle_failure(record: &mut JobRecord, working_dir: &Path, err: EfilingError) -> Result<JobEnd> {
    let status = if err.is_permission_denied() {
        JobStatus::NoWritePermission
    } else if err.category() == FaultCategory::FolderPrecondition {
        JobStatus::PreconditionFailed
    } else {
        JobStatus::Failed
    };
    finish(record, status, &err.to_string());
    if err.is_configuration_fault() {
        error!(dir = %working_dir.display(), "configuration fault, stopping batch: {err}");
        return Err(err);
    }
    Ok(JobEnd::Finished)
}

fn folders_value(outcome: &WriteOutcome) -> Value {
    let mut tables = Map::new();
    for (index, status) in &outcome.statuses {
        match serde_json::to_value(status) {
            Ok(value) => {
                tables.insert(format!("table_{index}"), value);
            }
            Err(err) => warn!(table = index, "folder status not serializable: {err}"),
        }
    }
    Value::Object(tables)
}
