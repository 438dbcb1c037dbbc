use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::document::{Cell, CellAddr, ImagePlacement, Table};
use crate::error::{EfilingError, Result};
use crate::rules::{FieldKind, FieldsSpec};
use crate::task::Task;

pub const SIGNATURE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "gif"];
pub const DEFAULT_SIGNATURE: &str = "default.jpg";

pub struct FieldContext<'a> {
    pub signs_dir: &'a Path,
    pub today: NaiveDate,
}

pub fn find_signature(signs_dir: &Path, engineer: &str) -> Option<PathBuf> {
    let name = engineer.trim();
    if name.is_empty() {
        return None;
    }
    let entries = match fs::read_dir(signs_dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(dir = %signs_dir.display(), "signature folder unavailable: {err}");
            return None;
        }
    };
    let present: HashSet<OsString> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .map(|entry| entry.file_name())
        .collect();
    SIGNATURE_EXTENSIONS.iter().find_map(|ext| {
        let candidate = format!("{name}.{ext}");
        present
            .contains(&OsString::from(&candidate))
            .then(|| signs_dir.join(candidate))
    })
}

pub fn signature_or_default(signs_dir: &Path, engineer: &str) -> PathBuf {
    find_signature(signs_dir, engineer).unwrap_or_else(|| {
        warn!(engineer, "no signature image found, using default");
        signs_dir.join(DEFAULT_SIGNATURE)
    })
}

pub fn write_fields<T: Table>(
    table: &T,
    task: &Task,
    fields: &FieldsSpec,
    ctx: &FieldContext<'_>,
) -> Result<usize> {
    let mut written = 0;
    for (name, spec) in fields {
        let refs = match spec {
            Some(spec) if !name.trim().is_empty() && !spec.refs().is_empty() => spec.refs(),
            _ => {
                warn!(field = %name, "invalid field entry, skipping");
                continue;
            }
        };
        for cell_ref in refs {
            let cell = table.cell(CellAddr::new(cell_ref.row, cell_ref.column))?;
            match cell_ref.kind {
                FieldKind::Text => {
                    let value = task
                        .field(name)
                        .ok_or_else(|| EfilingError::MissingTaskField(name.clone()))?;
                    cell.set_text(value)?;
                }
                FieldKind::Date => {
                    cell.set_text(&ctx.today.format("%Y-%m-%d").to_string())?;
                }
                FieldKind::Image => {
                    let engineer = task.engineers.as_deref().unwrap_or("");
                    let image = signature_or_default(ctx.signs_dir, engineer);
                    if !image.is_file() {
                        return Err(EfilingError::ImageNotFound(image));
                    }
                    cell.insert_image(&image, ImagePlacement::SIGNATURE)?;
                }
            }
            debug!(field = %name, row = cell_ref.row, column = cell_ref.column, "field written");
            written += 1;
        }
    }
    Ok(written)
}
