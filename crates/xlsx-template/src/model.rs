//! In-memory cell model.
//!
//! [`Workbook`] is the plain reference implementation of [`TemplateDocument`]: ordered named
//! sheets holding text and formula cells. The XLSX backend can also decode itself into one
//! (see [`crate::XlsxTemplate::to_workbook`]) so documents can be compared content-wise.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::document::{FormulaCell, TemplateDocument};

/// Zero-based cell coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum A1ParseError {
    #[error("empty cell reference")]
    Empty,
    #[error("cell reference is missing its column letters")]
    MissingColumn,
    #[error("cell reference is missing its row number")]
    MissingRow,
    #[error("invalid column in cell reference")]
    InvalidColumn,
    #[error("invalid row in cell reference")]
    InvalidRow,
}

impl CellRef {
    #[inline]
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Excel A1 notation (`A1`, `BC32`).
    pub fn to_a1(self) -> String {
        format!("{}{}", col_to_name(self.col), u64::from(self.row) + 1)
    }

    /// Parse `A1`-style references; `$` markers are accepted and ignored.
    pub fn from_a1(a1: &str) -> Result<Self, A1ParseError> {
        let s = a1.trim();
        if s.is_empty() {
            return Err(A1ParseError::Empty);
        }
        let s = s.strip_prefix('$').unwrap_or(s);
        let split = s
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(s.len());
        let (letters, rest) = s.split_at(split);
        if letters.is_empty() {
            return Err(A1ParseError::MissingColumn);
        }
        let digits = rest.strip_prefix('$').unwrap_or(rest);
        if digits.is_empty() {
            return Err(A1ParseError::MissingRow);
        }
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(A1ParseError::InvalidRow);
        }
        let row: u32 = digits.parse().map_err(|_| A1ParseError::InvalidRow)?;
        if row == 0 {
            return Err(A1ParseError::InvalidRow);
        }
        Ok(Self::new(row - 1, name_to_col(letters)?))
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1())
    }
}

fn col_to_name(col: u32) -> String {
    let mut n = u64::from(col) + 1;
    let mut out = Vec::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        out.push(char::from(b'A' + rem));
        n = (n - 1) / 26;
    }
    out.iter().rev().collect()
}

fn name_to_col(letters: &str) -> Result<u32, A1ParseError> {
    let mut col: u32 = 0;
    for b in letters.bytes() {
        let v = u32::from(b.to_ascii_uppercase() - b'A') + 1;
        col = col
            .checked_mul(26)
            .and_then(|c| c.checked_add(v))
            .ok_or(A1ParseError::InvalidColumn)?;
    }
    Ok(col - 1)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    /// Literal text; always a substitution target.
    Text(String),
    /// Computed cell; never rewritten. `cached` is the last stored result, if any.
    Formula {
        formula: String,
        cached: Option<String>,
    },
}

impl Cell {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn formula(formula: impl Into<String>) -> Self {
        Self::Formula {
            formula: formula.into(),
            cached: None,
        }
    }

    pub fn is_formula(&self) -> bool {
        matches!(self, Self::Formula { .. })
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Formula { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    pub name: String,
    pub cells: BTreeMap<CellRef, Cell>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cells: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, cell: CellRef, value: Cell) -> &mut Self {
        self.cells.insert(cell, value);
        self
    }

    pub fn get(&self, cell: CellRef) -> Option<&Cell> {
        self.cells.get(&cell)
    }

    pub fn get_a1(&self, a1: &str) -> Option<&Cell> {
        CellRef::from_a1(a1).ok().and_then(|cell| self.get(cell))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sheet(&mut self, name: impl Into<String>) -> &mut Sheet {
        self.sheets.push(Sheet::new(name));
        let last = self.sheets.len() - 1;
        &mut self.sheets[last]
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }
}

impl TemplateDocument for Workbook {
    fn for_each_text_cell(&mut self, rewrite: &mut dyn FnMut(&str) -> Option<String>) -> usize {
        let mut rewritten = 0;
        for sheet in &mut self.sheets {
            for cell in sheet.cells.values_mut() {
                if let Cell::Text(text) = cell {
                    if let Some(new_text) = rewrite(text) {
                        *text = new_text;
                        rewritten += 1;
                    }
                }
            }
        }
        rewritten
    }

    fn for_each_text_value(&self, visit: &mut dyn FnMut(&str)) {
        for sheet in &self.sheets {
            for cell in sheet.cells.values() {
                if let Cell::Text(text) = cell {
                    visit(text);
                }
            }
        }
    }

    fn for_each_formula_cell(&self, visit: &mut dyn FnMut(FormulaCell<'_>)) {
        for sheet in &self.sheets {
            for (cell, value) in &sheet.cells {
                if let Cell::Formula { formula, .. } = value {
                    visit(FormulaCell {
                        sheet: &sheet.name,
                        cell: *cell,
                        formula,
                    });
                }
            }
        }
    }
}
