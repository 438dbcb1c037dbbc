use tracing::{debug, error, warn};

use crate::cache::CoordinateCache;
use crate::document::{Cell, CellAddr, Table, Toggle};
use crate::error::{EfilingError, Result};
use crate::rules::{OptionSpec, OptionsSpec};
use crate::status::FolderStatus;
use crate::team::Team;

#[derive(Debug, Clone, Copy)]
pub struct ToggleLookup<'a> {
    pub template: &'a str,
    pub table_index: usize,
    pub cache: Option<&'a CoordinateCache>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToggleReport {
    pub written: usize,
    pub unchanged: usize,
    pub skipped: usize,
}

impl ToggleReport {
    fn record(&mut self, changed: bool) {
        if changed {
            self.written += 1;
        } else {
            self.unchanged += 1;
        }
    }
}

/// Finds the cell of `row` that hosts a toggle pair. The cached coordinate
/// is used only when it names the same row and actually hosts a control;
/// otherwise the row is scanned.
pub fn resolve_toggle_cell<T: Table>(
    table: &T,
    row: u32,
    lookup: &ToggleLookup<'_>,
) -> Result<Option<T::Cell>> {
    if let Some(at) = lookup
        .cache
        .and_then(|cache| cache.lookup(lookup.template, lookup.table_index, row))
    {
        if at.row != row {
            warn!(
                template = lookup.template,
                table = lookup.table_index,
                row,
                cached_row = at.row,
                "cached coordinate names another row; scanning"
            );
        } else {
            match table.cell(at) {
                Ok(cell) if hosts_toggle(&cell) => return Ok(Some(cell)),
                Ok(_) => warn!(
                    template = lookup.template,
                    table = lookup.table_index,
                    row,
                    column = at.column,
                    "stale cached coordinate holds no toggle control; scanning"
                ),
                Err(err) => warn!(
                    table = lookup.table_index,
                    row,
                    column = at.column,
                    "cached cell unavailable, scanning: {err}"
                ),
            }
        }
    }
    scan_row(table, row)
}

pub fn scan_row<T: Table>(table: &T, row: u32) -> Result<Option<T::Cell>> {
    let rows = table.row_count()?;
    if row < 1 || row > rows {
        error!(row, rows, "invalid row index");
        return Ok(None);
    }
    for column in 1..=table.column_count()? {
        match table.cell(CellAddr::new(row, column)) {
            Ok(cell) => {
                if hosts_toggle(&cell) {
                    return Ok(Some(cell));
                }
            }
            Err(err) => debug!(row, column, "error accessing cell: {err}"),
        }
    }
    Ok(None)
}

fn hosts_toggle<C: Cell>(cell: &C) -> bool {
    cell.toggles().map(|found| !found.is_empty()).unwrap_or(false)
}

/// Sets the YES/NO pair of `cell` to `value`. Returns `false` without
/// touching the document when the pair already reads `value`/`!value`.
pub fn set_toggle<C: Cell>(cell: &C, value: bool) -> Result<bool> {
    let toggles = cell.toggles()?;
    let [yes, no, ..] = toggles.as_slice() else {
        return Err(EfilingError::MalformedToggle {
            found: toggles.len(),
        });
    };
    if yes.value()? == value && no.value()? == !value {
        return Ok(false);
    }
    yes.set_value(value)?;
    no.set_value(!value)?;
    Ok(true)
}

impl Team {
    pub fn write_options<T: Table>(
        &self,
        table: &T,
        lookup: &ToggleLookup<'_>,
        status: &FolderStatus,
        options: &OptionsSpec,
    ) -> Result<ToggleReport> {
        match self {
            Team::General => write_options_general(table, lookup, status, options),
            Team::Ppt => write_options_strict(table, lookup, status, options),
        }
    }
}

fn write_options_strict<T: Table>(
    table: &T,
    lookup: &ToggleLookup<'_>,
    status: &FolderStatus,
    options: &OptionsSpec,
) -> Result<ToggleReport> {
    let mut report = ToggleReport::default();
    for (folder, spec) in options {
        let OptionSpec::Presence(row) = spec else {
            debug!(folder = %folder, "invalid row number, skipping");
            report.skipped += 1;
            continue;
        };
        let cell = resolve_toggle_cell(table, *row, lookup)?.ok_or_else(|| {
            EfilingError::ToggleNotFound {
                table: lookup.table_index,
                row: *row,
                folder: folder.clone(),
            }
        })?;
        match status.get(folder).and_then(|entry| entry.presence()) {
            Some(value) => report.record(set_toggle(&cell, value)?),
            None => {
                debug!(folder = %folder, "no status for folder");
                report.skipped += 1;
            }
        }
    }
    Ok(report)
}

fn write_options_general<T: Table>(
    table: &T,
    lookup: &ToggleLookup<'_>,
    status: &FolderStatus,
    options: &OptionsSpec,
) -> Result<ToggleReport> {
    let mut report = ToggleReport::default();
    for (folder, spec) in options {
        let Some(entry) = status.get(folder) else {
            warn!(folder = %folder, "folder status undefined");
            report.skipped += spec.rows().len();
            continue;
        };
        match spec {
            OptionSpec::Presence(row) => {
                let Some(value) = entry.presence() else {
                    warn!(folder = %folder, "status does not match a presence option");
                    report.skipped += 1;
                    continue;
                };
                write_optional(table, lookup, *row, folder, value, &mut report)?;
            }
            OptionSpec::Rules(rules) => {
                for (key, row) in rules {
                    let value = entry.rule(key).unwrap_or_else(|| {
                        warn!(folder = %folder, rule = %key, "no status for rule");
                        false
                    });
                    write_optional(table, lookup, *row, folder, value, &mut report)?;
                }
            }
        }
    }
    Ok(report)
}

fn write_optional<T: Table>(
    table: &T,
    lookup: &ToggleLookup<'_>,
    row: u32,
    folder: &str,
    value: bool,
    report: &mut ToggleReport,
) -> Result<()> {
    match resolve_toggle_cell(table, row, lookup)? {
        Some(cell) => report.record(set_toggle(&cell, value)?),
        None => {
            warn!(folder, row, table = lookup.table_index, "option cell not found");
            report.skipped += 1;
        }
    }
    Ok(())
}
