//! Console tables.
//!
//! The renderer is picked once at startup from [`Capabilities`] and passed to
//! the reports explicitly.

use std::io::{self, Write};

#[cfg(feature = "grid")]
mod grid;
mod plain;

#[cfg(feature = "grid")]
pub use grid::GridRenderer;
pub use plain::PlainRenderer;

pub const ATTRIBUTE_SET_WIDTHS: &[usize] = &[20, 40];
pub const ATTRIBUTE_WIDTHS: &[usize] = &[15, 25, 15, 10, 10];
pub const CATEGORY_WIDTHS: &[usize] = &[12, 10, 10, 8, 12, 20, 15, 30, 20, 20, 15, 15];
pub const STORE_WIDTHS: &[usize] = &[10, 15, 12, 10, 25, 12, 10];
pub const PRODUCT_WIDTHS: &[usize] = &[10, 20, 30, 6, 12, 15, 12, 12, 8, 20];
pub const ATTRIBUTE_DETAIL_WIDTHS: &[usize] = &[12, 25, 15, 10, 11, 15, 30];
pub const CATEGORY_ATTRIBUTE_WIDTHS: &[usize] = &[12, 25, 25, 12, 8, 10, 30];

/// Headers and rows of text, plus the column widths used by the fixed-width
/// layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub widths: &'static [usize],
}

pub trait Renderer {
    fn render(&self, table: &Table, out: &mut dyn Write) -> io::Result<()>;
}

/// What the current build and invocation allow for output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub grid: bool,
}

impl Table {
    pub fn new<H: AsRef<str>>(headers: &[H], widths: &'static [usize]) -> Self {
        Self {
            headers: headers.iter().map(|header| header.as_ref().to_owned()).collect(),
            rows: Vec::new(),
            widths,
        }
    }

    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell text, empty for cells a short row does not have.
    pub(crate) fn cell(row: &[String], column: usize) -> &str {
        row.get(column).map(String::as_str).unwrap_or_default()
    }
}

impl Capabilities {
    pub fn probe(force_plain: bool) -> Self {
        Self {
            grid: cfg!(feature = "grid") && !force_plain,
        }
    }
}

#[cfg(feature = "grid")]
fn grid_renderer() -> Option<Box<dyn Renderer>> {
    Some(Box::new(GridRenderer::default()))
}

#[cfg(not(feature = "grid"))]
fn grid_renderer() -> Option<Box<dyn Renderer>> {
    None
}

pub fn renderer_for(capabilities: &Capabilities) -> Box<dyn Renderer> {
    capabilities
        .grid
        .then(grid_renderer)
        .flatten()
        .unwrap_or_else(|| Box::new(PlainRenderer) as Box<dyn Renderer>)
}
