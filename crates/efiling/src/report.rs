use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use efiling_core::{
    is_broken_target, precheck, FaultCategory, FileMap, PathResolver, SymlinkResolver, TableSpec,
    Task, Team, YearFolderResolver,
};
use efiling_report::{JobRecord, JobStatus, JsonlWriter};
use indexmap::IndexMap;
use tracing::{info, warn};

use crate::status::evaluate_tables;
use crate::AppContext;

pub fn run(ctx: &AppContext, tasks: &Path, output: &Path) -> Result<()> {
    let team = ctx.user.team;
    let tables = ctx.system.rules.tables(team)?;
    let file_map = ctx.system.rules.file_map();
    let tasks = read_tasks(tasks, &ctx.user.task_list_map)?;
    match team {
        Team::General => run_with(
            &tasks,
            output,
            team,
            tables,
            file_map,
            &YearFolderResolver::new(&ctx.user.base_dir),
        ),
        Team::Ppt => run_with(
            &tasks,
            output,
            team,
            tables,
            file_map,
            &SymlinkResolver::new(&ctx.user.base_dir),
        ),
    }
}

fn run_with<R: PathResolver>(
    tasks: &[Task],
    output: &Path,
    team: Team,
    tables: &[TableSpec],
    file_map: &FileMap,
    resolver: &R,
) -> Result<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file = File::create(output)
        .with_context(|| format!("failed to create report {}", output.display()))?;
    let mut writer = JsonlWriter::new(BufWriter::new(file));
    for (index, task) in tasks.iter().enumerate() {
        info!(job_no = %task.job_no, "job {}/{}", index + 1, tasks.len());
        let record = evaluate_job(task, team, tables, file_map, resolver);
        writer.write_record(&record)?;
    }
    writer.into_inner().flush()?;
    println!(
        "[efiling] wrote {} job records to {}",
        tasks.len(),
        output.display()
    );
    Ok(())
}

fn evaluate_job<R: PathResolver>(
    task: &Task,
    team: Team,
    tables: &[TableSpec],
    file_map: &FileMap,
    resolver: &R,
) -> JobRecord {
    let mut record = JobRecord::new(task.job_no.clone(), JobStatus::Processing);
    record.job_creator = task.job_creator.clone().unwrap_or_default();
    record.engineers = task.engineers.clone().unwrap_or_default();
    let working_dir = match resolver.resolve(&task.job_no) {
        Some(dir) if is_broken_target(&dir) => {
            finish(&mut record, JobStatus::BrokenShortcut, "job shortcut points nowhere");
            return record;
        }
        Some(dir) => dir,
        None => {
            finish(&mut record, JobStatus::NotFound, "job folder not found");
            return record;
        }
    };
    record.target_path = Some(working_dir.display().to_string());
    if !precheck(&working_dir, team, tables) {
        finish(&mut record, JobStatus::PreconditionFailed, "folder precheck failed");
        return record;
    }
    match evaluate_tables(team, tables, file_map, &working_dir) {
        Ok(folders) => {
            record.folders = folders;
            finish(&mut record, JobStatus::Evaluated, "folders evaluated");
        }
        Err(err) => {
            warn!(job_no = %task.job_no, "evaluation failed: {err}");
            let status = if err.category() == FaultCategory::FolderPrecondition {
                JobStatus::PreconditionFailed
            } else {
                JobStatus::Failed
            };
            finish(&mut record, status, &err.to_string());
        }
    }
    record
}

fn finish(record: &mut JobRecord, status: JobStatus, message: &str) {
    record.status = status;
    record.log(message);
}

/// Reads the task sheet. With a column map, fields come from fixed column
/// positions; otherwise from header names.
pub fn read_tasks(path: &Path, columns: &IndexMap<String, usize>) -> Result<Vec<Task>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to open task sheet {}", path.display()))?;
    let headers = reader.headers()?.clone();
    let mut tasks = Vec::new();
    for (line, row) in reader.records().enumerate() {
        let row = row.with_context(|| format!("invalid row {} in {}", line + 2, path.display()))?;
        let task = if columns.is_empty() {
            Task::from_pairs(headers.iter().zip(row.iter()))
        } else {
            Task::from_pairs(
                columns
                    .iter()
                    .map(|(name, column)| (name.as_str(), row.get(*column).unwrap_or(""))),
            )
        };
        if task.job_no.is_empty() {
            warn!(line = line + 2, "row without job number, skipping");
            continue;
        }
        tasks.push(task);
    }
    if tasks.is_empty() {
        return Err(anyhow!("no tasks found in {}", path.display()));
    }
    Ok(tasks)
}
