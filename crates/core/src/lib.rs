mod batch;
mod cache;
mod checklist;
mod document;
mod error;
mod fields;
mod locate;
mod precheck;
mod process;
mod rules;
mod status;
mod task;
mod team;
mod toggle;
mod writer;

pub mod memory;

pub use batch::{BatchContext, BatchRunner, BatchSummary, CancelToken};
pub use cache::{
    merge_into_file, scan_document, scan_template, CoordinateCache, LazyCache,
    TemplateCoordinates,
};
pub use checklist::{find_checklists, resolve_document, ChecklistPolicy, CHECKLIST_FILE_NAME};
pub use document::{
    Automation, Cell, CellAddr, Document, DocumentEditor, ImagePlacement, Table, Toggle,
};
pub use error::{EfilingError, FaultCategory, Result};
pub use fields::{
    find_signature, signature_or_default, write_fields, FieldContext, DEFAULT_SIGNATURE,
    SIGNATURE_EXTENSIONS,
};
pub use locate::{is_broken_target, PathResolver, SymlinkResolver, YearFolderResolver};
pub use precheck::precheck;
pub use process::{ProcessTerminator, SysinfoTerminator, EDITOR_PROCESS_NAME};
pub use rules::{
    FieldCellRef, FieldKind, FieldSpec, FieldsSpec, FileMap, OptionSpec, OptionsSpec,
    RuleConfig, TableSpec,
};
pub use status::{
    evaluate_general, evaluate_strict, has_any_file, pattern_matches, subfolder_path,
    FolderEntry, FolderStatus,
};
pub use task::Task;
pub use team::Team;
pub use toggle::{resolve_toggle_cell, scan_row, set_toggle, ToggleLookup, ToggleReport};
pub use writer::{ChecklistWriter, WriteOutcome, WriterSettings};

pub use efiling_report::{JobRecord, JobStatus, ResultStore};
