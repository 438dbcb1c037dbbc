//! Boundary traits over a document-editing automation surface.
//!
//! Handles follow automation semantics: they are cheap references into the
//! open document, so mutating methods take `&self`. All row and column
//! coordinates are 1-based; table indices are 0-based and follow physical
//! table order.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellAddr {
    pub row: u32,
    pub column: u32,
}

impl CellAddr {
    pub fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagePlacement {
    pub width: f32,
    pub height: f32,
    pub centered: bool,
    pub float_at_origin: bool,
}

impl ImagePlacement {
    pub const SIGNATURE: ImagePlacement = ImagePlacement {
        width: 80.0,
        height: 20.0,
        centered: true,
        float_at_origin: true,
    };
}

pub trait Automation {
    type Editor: DocumentEditor;

    fn open_application(&self) -> Result<Self::Editor>;
}

pub trait DocumentEditor {
    type Document: Document;

    fn open_document(&mut self, path: &Path) -> Result<Self::Document>;
    fn quit(self) -> Result<()>;
}

pub trait Document {
    type Table: Table;

    fn table_count(&self) -> Result<usize>;
    fn table(&self, index: usize) -> Result<Self::Table>;
    fn save(&mut self) -> Result<()>;
    fn close(self) -> Result<()>;
}

pub trait Table {
    type Cell: Cell;

    fn row_count(&self) -> Result<u32>;
    fn column_count(&self) -> Result<u32>;
    fn cell(&self, at: CellAddr) -> Result<Self::Cell>;
}

pub trait Cell {
    type Toggle: Toggle;

    fn set_text(&self, text: &str) -> Result<()>;
    fn insert_image(&self, image: &Path, placement: ImagePlacement) -> Result<()>;
    /// Embedded controls recognised as toggles, in document order. Empty when
    /// the cell hosts none.
    fn toggles(&self) -> Result<Vec<Self::Toggle>>;
}

pub trait Toggle {
    fn value(&self) -> Result<bool>;
    fn set_value(&self, value: bool) -> Result<()>;
}
