use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::document::{Automation, Cell, CellAddr, Document, DocumentEditor, Table};
use crate::error::{EfilingError, Result};

const TABLE_PREFIX: &str = "table_";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateCoordinates {
    pub description: Option<String>,
    pub scanned_from: Option<String>,
    tables: BTreeMap<usize, BTreeMap<u32, CellAddr>>,
}

impl TemplateCoordinates {
    pub fn insert(&mut self, table: usize, row: u32, at: CellAddr) {
        self.tables.entry(table).or_default().insert(row, at);
    }

    pub fn get(&self, table: usize, row: u32) -> Option<CellAddr> {
        self.tables.get(&table)?.get(&row).copied()
    }

    pub fn tables(&self) -> impl Iterator<Item = (usize, &BTreeMap<u32, CellAddr>)> {
        self.tables.iter().map(|(index, rows)| (*index, rows))
    }

    pub fn len(&self) -> usize {
        self.tables.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn to_value(&self) -> Value {
        let mut out = Map::new();
        if let Some(description) = &self.description {
            out.insert("description".into(), json!(description));
        }
        if let Some(scanned_from) = &self.scanned_from {
            out.insert("scanned_from".into(), json!(scanned_from));
        }
        for (index, rows) in &self.tables {
            let rows: Map<String, Value> = rows
                .iter()
                .map(|(row, at)| (row.to_string(), json!({"row": at.row, "column": at.column})))
                .collect();
            out.insert(format!("{TABLE_PREFIX}{index}"), Value::Object(rows));
        }
        Value::Object(out)
    }

    fn from_value(template: &str, raw: IndexMap<String, Value>) -> Result<Self> {
        let mut coords = TemplateCoordinates::default();
        for (key, value) in raw {
            match key.as_str() {
                "description" => coords.description = value.as_str().map(str::to_string),
                "scanned_from" => coords.scanned_from = value.as_str().map(str::to_string),
                _ => {
                    let Some(index) = key.strip_prefix(TABLE_PREFIX) else {
                        continue;
                    };
                    let index: usize = index.parse().map_err(|_| {
                        EfilingError::InvalidConfig(format!(
                            "coordinate cache {template}: bad table key {key:?}"
                        ))
                    })?;
                    let rows: BTreeMap<String, CellAddr> = serde_json::from_value(value)?;
                    for (row, at) in rows {
                        let row: u32 = row.parse().map_err(|_| {
                            EfilingError::InvalidConfig(format!(
                                "coordinate cache {template}: bad row key {row:?}"
                            ))
                        })?;
                        coords.insert(index, row, at);
                    }
                }
            }
        }
        Ok(coords)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CoordinateCache {
    templates: BTreeMap<String, TemplateCoordinates>,
}

impl CoordinateCache {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let parsed: IndexMap<String, IndexMap<String, Value>> = serde_json::from_str(raw)?;
        let mut templates = BTreeMap::new();
        for (name, body) in parsed {
            let coords = TemplateCoordinates::from_value(&name, body)?;
            templates.insert(name, coords);
        }
        Ok(Self { templates })
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no coordinate cache file");
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn lookup(&self, template: &str, table: usize, row: u32) -> Option<CellAddr> {
        self.templates.get(template)?.get(table, row)
    }

    pub fn template(&self, name: &str) -> Option<&TemplateCoordinates> {
        self.templates.get(name)
    }

    pub fn templates(&self) -> impl Iterator<Item = (&str, &TemplateCoordinates)> {
        self.templates.iter().map(|(name, coords)| (name.as_str(), coords))
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

pub fn merge_into_file(path: &Path, template: &str, coords: &TemplateCoordinates) -> Result<()> {
    let mut existing: Map<String, Value> = if path.exists() {
        serde_json::from_str(&fs::read_to_string(path)?)?
    } else {
        Map::new()
    };
    existing.insert(template.to_string(), coords.to_value());
    fs::write(path, serde_json::to_string_pretty(&Value::Object(existing))?)?;
    info!(path = %path.display(), template, controls = coords.len(), "coordinate cache saved");
    Ok(())
}

#[derive(Debug)]
pub struct LazyCache {
    path: PathBuf,
    cell: OnceCell<CoordinateCache>,
}

impl LazyCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cell: OnceCell::new(),
        }
    }

    pub fn preloaded(cache: CoordinateCache) -> Self {
        Self {
            path: PathBuf::new(),
            cell: OnceCell::with_value(cache),
        }
    }

    pub fn get(&self) -> &CoordinateCache {
        self.cell.get_or_init(|| match CoordinateCache::load(&self.path) {
            Ok(cache) => cache,
            Err(err) => {
                warn!(
                    path = %self.path.display(),
                    "coordinate cache unreadable, falling back to row scans: {err}"
                );
                CoordinateCache::default()
            }
        })
    }
}

pub fn scan_document<D: Document>(doc: &D) -> Result<TemplateCoordinates> {
    let mut coords = TemplateCoordinates::default();
    for index in 0..doc.table_count()? {
        let table = doc.table(index)?;
        let rows = table.row_count()?;
        let columns = table.column_count()?;
        for row in 1..=rows {
            for column in 1..=columns {
                let at = CellAddr::new(row, column);
                let cell = match table.cell(at) {
                    Ok(cell) => cell,
                    Err(err) => {
                        debug!(table = index, row, column, "skipping cell: {err}");
                        continue;
                    }
                };
                if cell.toggles().map(|t| !t.is_empty()).unwrap_or(false) {
                    coords.insert(index, row, at);
                    break;
                }
            }
        }
        debug!(table = index, "scanned table");
    }
    Ok(coords)
}

pub fn scan_template<A: Automation>(
    automation: &A,
    template_path: &Path,
    template_name: &str,
) -> Result<TemplateCoordinates> {
    let mut editor = automation.open_application()?;
    let doc = editor.open_document(template_path)?;
    let scanned = scan_document(&doc);
    doc.close()?;
    editor.quit()?;
    let mut coords = scanned?;
    coords.description = Some(format!("{template_name} toggle control coordinates"));
    coords.scanned_from = Some(template_path.display().to_string());
    info!(template = template_name, controls = coords.len(), "template scanned");
    Ok(coords)
}
