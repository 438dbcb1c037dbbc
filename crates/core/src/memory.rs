//! In-process automation backend. Tables live in memory, every mutation is
//! counted, and save failures can be injected. Saving stamps the file on
//! disk; a file replaced behind the editor's back is reopened from its
//! layout.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::document::{
    Automation, Cell, CellAddr, Document, DocumentEditor, ImagePlacement, Table, Toggle,
};
use crate::error::{EfilingError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutationStats {
    pub cell_probes: usize,
    pub text_writes: usize,
    pub image_inserts: usize,
    pub toggle_writes: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedImage {
    pub path: PathBuf,
    pub placement: ImagePlacement,
}

#[derive(Debug, Clone, Default)]
struct CellState {
    text: String,
    images: Vec<PlacedImage>,
    toggles: Vec<bool>,
    unavailable: bool,
}

#[derive(Debug, Clone)]
pub struct TableLayout {
    rows: u32,
    columns: u32,
    cells: BTreeMap<CellAddr, CellState>,
}

impl TableLayout {
    pub fn new(rows: u32, columns: u32) -> Self {
        Self {
            rows,
            columns,
            cells: BTreeMap::new(),
        }
    }

    pub fn with_toggle(self, row: u32, column: u32) -> Self {
        self.with_toggle_values(row, column, false, false)
    }

    pub fn with_toggle_values(mut self, row: u32, column: u32, yes: bool, no: bool) -> Self {
        self.cells
            .entry(CellAddr::new(row, column))
            .or_default()
            .toggles = vec![yes, no];
        self
    }

    pub fn with_text(mut self, row: u32, column: u32, text: &str) -> Self {
        self.cells
            .entry(CellAddr::new(row, column))
            .or_default()
            .text = text.to_string();
        self
    }

    pub fn with_unavailable_cell(mut self, row: u32, column: u32) -> Self {
        self.cells
            .entry(CellAddr::new(row, column))
            .or_default()
            .unavailable = true;
        self
    }
}

#[derive(Debug, Default)]
struct DocumentState {
    tables: Vec<TableLayout>,
    stats: MutationStats,
    saves: usize,
    closed: bool,
    save_error: Option<io::ErrorKind>,
    on_disk: Option<Vec<u8>>,
}

impl DocumentState {
    fn fresh(tables: Vec<TableLayout>) -> SharedDocument {
        Rc::new(RefCell::new(DocumentState {
            tables,
            ..DocumentState::default()
        }))
    }

    fn matches_disk(&self, contents: &[u8]) -> bool {
        match &self.on_disk {
            Some(seen) => seen.as_slice() == contents,
            None => true,
        }
    }
}

type SharedDocument = Rc<RefCell<DocumentState>>;

#[derive(Debug, Default)]
struct Library {
    layouts: HashMap<PathBuf, Vec<TableLayout>>,
    documents: HashMap<PathBuf, SharedDocument>,
    fallback: Option<Vec<TableLayout>>,
    save_error: Option<io::ErrorKind>,
    launches: usize,
    quits: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryAutomation {
    library: Rc<RefCell<Library>>,
}

impl MemoryAutomation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, path: impl Into<PathBuf>, tables: Vec<TableLayout>) {
        let path = path.into();
        let mut library = self.library.borrow_mut();
        library
            .documents
            .insert(path.clone(), DocumentState::fresh(tables.clone()));
        library.layouts.insert(path, tables);
    }

    pub fn set_fallback(&self, tables: Vec<TableLayout>) {
        self.library.borrow_mut().fallback = Some(tables);
    }

    pub fn fail_saves_with(&self, kind: io::ErrorKind) {
        self.library.borrow_mut().save_error = Some(kind);
    }

    pub fn table(&self, path: &Path, index: usize) -> Option<MemoryTable> {
        let doc = self.library.borrow().documents.get(path).cloned()?;
        if index >= doc.borrow().tables.len() {
            return None;
        }
        Some(MemoryTable { doc, index })
    }

    pub fn stats(&self, path: &Path) -> Option<MutationStats> {
        let library = self.library.borrow();
        let doc = library.documents.get(path)?;
        let stats = doc.borrow().stats;
        Some(stats)
    }

    pub fn saves(&self, path: &Path) -> usize {
        self.library
            .borrow()
            .documents
            .get(path)
            .map(|doc| doc.borrow().saves)
            .unwrap_or(0)
    }

    pub fn is_closed(&self, path: &Path) -> bool {
        self.library
            .borrow()
            .documents
            .get(path)
            .map(|doc| doc.borrow().closed)
            .unwrap_or(false)
    }

    pub fn launches(&self) -> usize {
        self.library.borrow().launches
    }

    pub fn quits(&self) -> usize {
        self.library.borrow().quits
    }
}

impl Automation for MemoryAutomation {
    type Editor = MemoryEditor;

    fn open_application(&self) -> Result<MemoryEditor> {
        self.library.borrow_mut().launches += 1;
        Ok(MemoryEditor {
            library: Rc::clone(&self.library),
        })
    }
}

#[derive(Debug)]
pub struct MemoryEditor {
    library: Rc<RefCell<Library>>,
}

impl DocumentEditor for MemoryEditor {
    type Document = MemoryDocument;

    fn open_document(&mut self, path: &Path) -> Result<MemoryDocument> {
        if !path.is_file() {
            return Err(EfilingError::Automation(format!(
                "document not found: {}",
                path.display()
            )));
        }
        let contents = fs::read(path)?;
        let mut library = self.library.borrow_mut();
        let save_error = library.save_error;
        let existing = library
            .documents
            .get(path)
            .filter(|doc| doc.borrow().matches_disk(&contents))
            .cloned();
        let doc = match existing {
            Some(doc) => doc,
            None => {
                let tables = library
                    .layouts
                    .get(path)
                    .or(library.fallback.as_ref())
                    .cloned()
                    .ok_or_else(|| {
                        EfilingError::Automation(format!(
                            "no contents registered for {}",
                            path.display()
                        ))
                    })?;
                let doc = DocumentState::fresh(tables);
                library
                    .documents
                    .insert(path.to_path_buf(), Rc::clone(&doc));
                doc
            }
        };
        {
            let mut state = doc.borrow_mut();
            state.closed = false;
            state.save_error = save_error;
            state.on_disk = Some(contents);
        }
        Ok(MemoryDocument {
            doc,
            path: path.to_path_buf(),
        })
    }

    fn quit(self) -> Result<()> {
        self.library.borrow_mut().quits += 1;
        Ok(())
    }
}

#[derive(Debug)]
pub struct MemoryDocument {
    doc: SharedDocument,
    path: PathBuf,
}

impl Document for MemoryDocument {
    type Table = MemoryTable;

    fn table_count(&self) -> Result<usize> {
        Ok(self.doc.borrow().tables.len())
    }

    fn table(&self, index: usize) -> Result<MemoryTable> {
        if index >= self.doc.borrow().tables.len() {
            return Err(EfilingError::Automation(format!(
                "table {index} does not exist"
            )));
        }
        Ok(MemoryTable {
            doc: Rc::clone(&self.doc),
            index,
        })
    }

    fn save(&mut self) -> Result<()> {
        let mut state = self.doc.borrow_mut();
        if let Some(kind) = state.save_error {
            return Err(EfilingError::Io(io::Error::new(
                kind,
                format!("cannot save {}", self.path.display()),
            )));
        }
        state.saves += 1;
        let stamp = format!("memory document {}, save {}", self.path.display(), state.saves);
        fs::write(&self.path, stamp.as_bytes())?;
        state.on_disk = Some(stamp.into_bytes());
        Ok(())
    }

    fn close(self) -> Result<()> {
        self.doc.borrow_mut().closed = true;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct MemoryTable {
    doc: SharedDocument,
    index: usize,
}

impl MemoryTable {
    pub fn detached(layout: TableLayout) -> Self {
        Self {
            doc: DocumentState::fresh(vec![layout]),
            index: 0,
        }
    }

    pub fn stats(&self) -> MutationStats {
        self.doc.borrow().stats
    }

    pub fn text_at(&self, row: u32, column: u32) -> Option<String> {
        self.with_cell(row, column, |cell| cell.text.clone())
    }

    pub fn images_at(&self, row: u32, column: u32) -> Vec<PlacedImage> {
        self.with_cell(row, column, |cell| cell.images.clone())
            .unwrap_or_default()
    }

    pub fn toggle_values_at(&self, row: u32, column: u32) -> Vec<bool> {
        self.with_cell(row, column, |cell| cell.toggles.clone())
            .unwrap_or_default()
    }

    fn with_cell<R>(&self, row: u32, column: u32, f: impl FnOnce(&CellState) -> R) -> Option<R> {
        let state = self.doc.borrow();
        state.tables[self.index]
            .cells
            .get(&CellAddr::new(row, column))
            .map(f)
    }
}

impl Table for MemoryTable {
    type Cell = MemoryCell;

    fn row_count(&self) -> Result<u32> {
        Ok(self.doc.borrow().tables[self.index].rows)
    }

    fn column_count(&self) -> Result<u32> {
        Ok(self.doc.borrow().tables[self.index].columns)
    }

    fn cell(&self, at: CellAddr) -> Result<MemoryCell> {
        let mut state = self.doc.borrow_mut();
        state.stats.cell_probes += 1;
        let layout = &state.tables[self.index];
        let out_of_range =
            at.row == 0 || at.column == 0 || at.row > layout.rows || at.column > layout.columns;
        let unavailable = layout
            .cells
            .get(&at)
            .map(|cell| cell.unavailable)
            .unwrap_or(false);
        if out_of_range || unavailable {
            return Err(EfilingError::Automation(format!(
                "cell ({}, {}) is not available",
                at.row, at.column
            )));
        }
        Ok(MemoryCell {
            doc: Rc::clone(&self.doc),
            table: self.index,
            at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct MemoryCell {
    doc: SharedDocument,
    table: usize,
    at: CellAddr,
}

impl MemoryCell {
    pub fn addr(&self) -> CellAddr {
        self.at
    }

    pub fn toggle_values(&self) -> Vec<bool> {
        let state = self.doc.borrow();
        state.tables[self.table]
            .cells
            .get(&self.at)
            .map(|cell| cell.toggles.clone())
            .unwrap_or_default()
    }

    fn update<R>(&self, f: impl FnOnce(&mut CellState, &mut MutationStats) -> R) -> R {
        let mut state = self.doc.borrow_mut();
        let DocumentState { tables, stats, .. } = &mut *state;
        let cell = tables[self.table].cells.entry(self.at).or_default();
        f(cell, stats)
    }
}

impl Cell for MemoryCell {
    type Toggle = MemoryToggle;

    fn set_text(&self, text: &str) -> Result<()> {
        self.update(|cell, stats| {
            cell.text = text.to_string();
            stats.text_writes += 1;
        });
        Ok(())
    }

    fn insert_image(&self, image: &Path, placement: ImagePlacement) -> Result<()> {
        if !image.is_file() {
            return Err(EfilingError::ImageNotFound(image.to_path_buf()));
        }
        self.update(|cell, stats| {
            cell.images.push(PlacedImage {
                path: image.to_path_buf(),
                placement,
            });
            stats.image_inserts += 1;
        });
        Ok(())
    }

    fn toggles(&self) -> Result<Vec<MemoryToggle>> {
        let count = self.toggle_values().len();
        Ok((0..count)
            .map(|slot| MemoryToggle {
                cell: self.clone(),
                slot,
            })
            .collect())
    }
}

#[derive(Debug, Clone)]
pub struct MemoryToggle {
    cell: MemoryCell,
    slot: usize,
}

impl Toggle for MemoryToggle {
    fn value(&self) -> Result<bool> {
        self.cell
            .toggle_values()
            .get(self.slot)
            .copied()
            .ok_or_else(|| EfilingError::Automation("toggle control vanished".into()))
    }

    fn set_value(&self, value: bool) -> Result<()> {
        self.cell.update(|cell, stats| {
            if let Some(slot) = cell.toggles.get_mut(self.slot) {
                *slot = value;
            }
            stats.toggle_writes += 1;
        });
        Ok(())
    }
}
