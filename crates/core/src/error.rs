use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EfilingError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("serde json error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("unknown team: {0}")]
    UnknownTeam(String),
    #[error("document has {found} tables but {expected} are configured")]
    TableCountMismatch { expected: usize, found: usize },
    #[error("{0:?} folder not found")]
    MissingSubfolder(PathBuf),
    #[error("checklist template not found: {0:?}")]
    TemplateNotFound(PathBuf),
    #[error("no checklist document found in {0:?}")]
    ChecklistNotFound(PathBuf),
    #[error("no toggle control found in table {table} row {row} for folder {folder:?}; check the row setting or the template")]
    ToggleNotFound {
        table: usize,
        row: u32,
        folder: String,
    },
    #[error("toggle pair has {found} controls, expected 2")]
    MalformedToggle { found: usize },
    #[error("task has no value for field {0:?}")]
    MissingTaskField(String),
    #[error("image file not found: {0:?}")]
    ImageNotFound(PathBuf),
    #[error("no write access to {0:?}")]
    PermissionDenied(PathBuf),
    #[error("automation error: {0}")]
    Automation(String),
}

pub type Result<T> = std::result::Result<T, EfilingError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultCategory {
    Configuration,
    JobResolution,
    FolderPrecondition,
    DocumentResolution,
    WriteTime,
}

impl EfilingError {
    pub fn category(&self) -> FaultCategory {
        match self {
            EfilingError::InvalidConfig(_)
            | EfilingError::UnknownTeam(_)
            | EfilingError::TableCountMismatch { .. } => FaultCategory::Configuration,
            EfilingError::MissingSubfolder(_) => FaultCategory::FolderPrecondition,
            EfilingError::TemplateNotFound(_) | EfilingError::ChecklistNotFound(_) => {
                FaultCategory::DocumentResolution
            }
            _ => FaultCategory::WriteTime,
        }
    }

    pub fn is_configuration_fault(&self) -> bool {
        self.category() == FaultCategory::Configuration
    }

    pub fn with_locked_path(self, path: &Path) -> Self {
        match self {
            EfilingError::Io(err) if err.kind() == io::ErrorKind::PermissionDenied => {
                EfilingError::PermissionDenied(path.to_path_buf())
            }
            other => other,
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        match self {
            EfilingError::PermissionDenied(_) => true,
            EfilingError::Io(err) => err.kind() == io::ErrorKind::PermissionDenied,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_errors_are_recognised_through_io() {
        let err = EfilingError::from(io::Error::new(io::ErrorKind::PermissionDenied, "locked"));
        assert!(err.is_permission_denied());
        assert_eq!(err.category(), FaultCategory::WriteTime);
        assert!(!EfilingError::Automation("boom".into()).is_permission_denied());
    }

    #[test]
    fn locked_path_replaces_io_permission_errors_only() {
        let locked = Path::new("job/E-filing checklist.docx");
        let err = EfilingError::from(io::Error::new(io::ErrorKind::PermissionDenied, "locked"))
            .with_locked_path(locked);
        assert!(matches!(&err, EfilingError::PermissionDenied(path) if path == locked));
        assert!(err.is_permission_denied());
        let other = EfilingError::from(io::Error::new(io::ErrorKind::NotFound, "gone"))
            .with_locked_path(locked);
        assert!(matches!(other, EfilingError::Io(_)));
    }

    #[test]
    fn table_mismatch_is_a_configuration_fault() {
        let err = EfilingError::TableCountMismatch {
            expected: 3,
            found: 1,
        };
        assert!(err.is_configuration_fault());
        assert_eq!(
            EfilingError::MissingSubfolder(PathBuf::from("x")).category(),
            FaultCategory::FolderPrecondition
        );
    }
}
