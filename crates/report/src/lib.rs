use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of one job in a batch. The set is closed: every job ends in
/// exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    NotFound,
    BrokenShortcut,
    PreconditionFailed,
    Processing,
    Evaluated,
    Completed,
    Failed,
    NoWritePermission,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::NotFound => "not found",
            JobStatus::BrokenShortcut => "broken shortcut",
            JobStatus::PreconditionFailed => "precondition failed",
            JobStatus::Processing => "processing",
            JobStatus::Evaluated => "evaluated",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::NoWritePermission => "no write permission",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Processing)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub timestamp: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_no: String,
    #[serde(default)]
    pub job_creator: String,
    #[serde(default)]
    pub engineers: String,
    pub target_path: Option<String>,
    pub status: JobStatus,
    #[serde(default)]
    pub folders: Value,
    #[serde(default)]
    pub logs: Vec<ProgressEntry>,
}

impl JobRecord {
    pub fn new(job_no: impl Into<String>, status: JobStatus) -> Self {
        Self {
            job_no: job_no.into(),
            job_creator: String::new(),
            engineers: String::new(),
            target_path: None,
            status,
            folders: Value::Null,
            logs: Vec::new(),
        }
    }

    pub fn log(&mut self, message: impl Into<String>) {
        self.logs.push(ProgressEntry {
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            message: message.into(),
        });
    }
}

/// Per-run collection of job records, keyed by job number for updates.
#[derive(Debug, Default, Clone)]
pub struct ResultStore {
    records: Vec<JobRecord>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, record: JobRecord) {
        self.records.push(record);
    }

    /// Replaces the record with the same job number. Returns false when no
    /// such record exists.
    pub fn update_by_job_no(&mut self, record: JobRecord) -> bool {
        match self
            .records
            .iter_mut()
            .find(|existing| existing.job_no == record.job_no)
        {
            Some(slot) => {
                *slot = record;
                true
            }
            None => false,
        }
    }

    pub fn get_by_job_no(&self, job_no: &str) -> Option<&JobRecord> {
        self.records.iter().find(|record| record.job_no == job_no)
    }

    pub fn records(&self) -> &[JobRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.records)?;
        fs::write(path, json)
            .with_context(|| format!("failed to write results to {}", path.display()))
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read results from {}", path.display()))?;
        let records: Vec<JobRecord> =
            serde_json::from_str(&raw).context("invalid results file")?;
        Ok(Self { records })
    }
}

pub struct JsonlWriter<W> {
    writer: W,
}

impl<W: Write> JsonlWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn write_record<T: Serialize>(&mut self, record: &T) -> Result<()> {
        let mut buf = serde_json::to_vec(record)?;
        buf.push(b'\n');
        self.writer.write_all(&buf)?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(job_no: &str, status: JobStatus) -> JobRecord {
        let mut record = JobRecord::new(job_no, status);
        record.job_creator = "X".to_string();
        record.engineers = "Y".to_string();
        record
    }

    #[test]
    fn jsonl_writer_emits_one_line_per_record() {
        let mut writer = JsonlWriter::new(Vec::new());
        writer
            .write_record(&record("250100032HZH", JobStatus::Completed))
            .unwrap();
        writer
            .write_record(&record("250100033HZH", JobStatus::NotFound))
            .unwrap();
        let buf = writer.into_inner();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: JobRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed.job_no, "250100033HZH");
        assert_eq!(parsed.status, JobStatus::NotFound);
    }

    #[test]
    fn update_by_job_no_replaces_existing_only() {
        let mut store = ResultStore::new();
        store.add(record("A1", JobStatus::Processing));
        assert!(store.update_by_job_no(record("A1", JobStatus::Completed)));
        assert!(!store.update_by_job_no(record("B2", JobStatus::Failed)));
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get_by_job_no("A1").map(|r| r.status),
            Some(JobStatus::Completed)
        );
    }

    #[test]
    fn store_survives_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.json");
        let mut store = ResultStore::new();
        let mut rec = record("A1", JobStatus::NoWritePermission);
        rec.log("write attempted");
        store.add(rec);
        store.save_to_file(&path).unwrap();

        let loaded = ResultStore::load_from_file(&path).unwrap();
        let rec = loaded.get_by_job_no("A1").unwrap();
        assert_eq!(rec.status, JobStatus::NoWritePermission);
        assert_eq!(rec.logs.len(), 1);
        assert_eq!(rec.logs[0].message, "write attempted");
    }

    #[test]
    fn status_strings_are_stable() {
        assert_eq!(JobStatus::NotFound.as_str(), "not found");
        assert_eq!(JobStatus::PreconditionFailed.as_str(), "precondition failed");
        assert_eq!(JobStatus::NoWritePermission.as_str(), "no write permission");
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }
}
