//! XLSX (SpreadsheetML) container backend.
//!
//! Opening a template inflates only the parts substitution needs: the workbook, its
//! relationships, the shared strings table and each worksheet. Saving splices rewritten string
//! items into those parts and raw-copies every other ZIP entry, so styles, column widths,
//! merged cells, formulas and everything the engine does not understand survive untouched.

mod shared_strings;
mod text;
mod workbook;
mod worksheet;
mod zip_util;

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{Cursor, Seek, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::document::{FormulaCell, TemplateDocument};
use crate::model::{Cell, CellRef, Workbook};
use crate::TemplateError;

use shared_strings::SharedStringsPart;
use worksheet::{CellContent, WorksheetPart};
use zip_util::{read_part_optional, stored_part_name, InflateBudget};

pub use zip_util::{TemplateLimits, DEFAULT_MAX_PART_BYTES, DEFAULT_MAX_TOTAL_BYTES};

/// An `.xlsx` template loaded into memory.
///
/// Cloning is cheap: the original package bytes are shared, and only the parsed string tables
/// are copied. A filled copy therefore never alters the template it came from.
#[derive(Debug, Clone)]
pub struct XlsxTemplate {
    source: Arc<[u8]>,
    origin: Option<PathBuf>,
    shared_strings: Option<SharedStringsPart>,
    worksheets: Vec<WorksheetPart>,
    /// Shared string items referenced by at least one non-formula cell.
    text_items: BTreeSet<u32>,
}

impl XlsxTemplate {
    /// Read a template from disk with the default [`TemplateLimits`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| TemplateError::TemplateNotFound {
            path: path.to_path_buf(),
            source,
        })?;
        let mut template = Self::from_bytes(bytes)?;
        template.origin = fs::canonicalize(path).ok();
        log::debug!(
            "opened template {} ({} worksheet(s))",
            path.display(),
            template.worksheets.len()
        );
        Ok(template)
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self, TemplateError> {
        Self::from_bytes_limited(bytes, TemplateLimits::default())
    }

    pub fn from_bytes_limited(
        bytes: impl Into<Vec<u8>>,
        limits: TemplateLimits,
    ) -> Result<Self, TemplateError> {
        let source: Arc<[u8]> = bytes.into().into();
        let mut archive = ZipArchive::new(Cursor::new(&source[..]))
            .map_err(|err| TemplateError::malformed("package", err))?;
        let mut budget = InflateBudget::new(limits);

        let workbook_xml = read_required(&mut archive, workbook::WORKBOOK_PART, &mut budget)?;
        let rels_xml = read_required(&mut archive, workbook::WORKBOOK_RELS_PART, &mut budget)?;

        let sheets = workbook::parse_workbook_sheets(&workbook_xml)?;
        let rels = workbook::parse_relationships(workbook::WORKBOOK_RELS_PART, &rels_xml)?;
        let sheet_parts = workbook::resolve_sheet_parts(sheets, &rels)?;

        let mut worksheets = Vec::with_capacity(sheet_parts.len());
        for sheet in sheet_parts {
            let entry = stored_part_name(&archive, &sheet.part).ok_or_else(|| {
                TemplateError::malformed(
                    &sheet.part,
                    format!("worksheet part for sheet {:?} is missing", sheet.name),
                )
            })?;
            let xml = read_required(&mut archive, &entry, &mut budget)?;
            worksheets.push(WorksheetPart::parse(sheet.name, entry, xml)?);
        }

        let sst_part = workbook::shared_strings_target(&rels)
            .unwrap_or_else(|| workbook::DEFAULT_SHARED_STRINGS_PART.to_string());
        let shared_strings = match stored_part_name(&archive, &sst_part) {
            Some(entry) => match read_part_optional(&mut archive, &entry, &mut budget)? {
                Some(xml) => Some(SharedStringsPart::parse(entry, xml)?),
                None => None,
            },
            None => None,
        };

        drop(archive);
        let text_items = text_items(&worksheets, shared_strings.as_ref());

        Ok(Self {
            source,
            origin: None,
            shared_strings,
            worksheets,
            text_items,
        })
    }

    /// Sheet names in workbook order (worksheets only).
    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.worksheets.iter().map(|ws| ws.sheet_name.as_str())
    }

    /// Current content of every text and formula cell, sheet by sheet in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (&str, CellRef, Cell)> + '_ {
        self.worksheets.iter().flat_map(move |ws| {
            ws.cells
                .iter()
                .filter_map(move |scanned| {
                    self.cell_value(ws, &scanned.content)
                        .map(|cell| (ws.sheet_name.as_str(), scanned.cell, cell))
                })
        })
    }

    /// Decode into the in-memory [`Workbook`] model.
    pub fn to_workbook(&self) -> Workbook {
        let mut workbook = Workbook::new();
        for ws in &self.worksheets {
            let sheet = workbook.add_sheet(ws.sheet_name.clone());
            for scanned in &ws.cells {
                if let Some(cell) = self.cell_value(ws, &scanned.content) {
                    sheet.set(scanned.cell, cell);
                }
            }
        }
        workbook
    }

    fn cell_value(&self, ws: &WorksheetPart, content: &CellContent) -> Option<Cell> {
        match content {
            CellContent::SharedString(index) => self
                .shared_strings
                .as_ref()
                .and_then(|sst| sst.text(*index))
                .map(Cell::Text),
            CellContent::Inline(index) => ws.inline_text(*index).map(Cell::Text),
            CellContent::Formula {
                formula,
                cached,
                shared_string,
            } => {
                let cached = match shared_string {
                    Some(index) => self.shared_strings.as_ref().and_then(|sst| sst.text(*index)),
                    None => cached.clone(),
                };
                Some(Cell::Formula {
                    formula: formula.clone(),
                    cached,
                })
            }
        }
    }

    /// Serialize the package. Unchanged entries are raw-copied without recompression.
    pub fn write_to<W: Write + Seek>(&self, output: W) -> Result<(), TemplateError> {
        let mut patched: BTreeMap<&str, Vec<u8>> = BTreeMap::new();
        if let Some(sst) = self.shared_strings.as_ref().filter(|sst| sst.is_dirty()) {
            patched.insert(sst.entry.as_str(), sst.render());
        }
        for ws in self.worksheets.iter().filter(|ws| ws.is_dirty()) {
            patched.insert(ws.entry.as_str(), ws.render());
        }

        let mut archive = ZipArchive::new(Cursor::new(&self.source[..]))
            .map_err(|err| TemplateError::malformed("package", err))?;
        let mut zip = ZipWriter::new(output);

        for i in 0..archive.len() {
            let file = archive
                .by_index(i)
                .map_err(|err| TemplateError::malformed("package", err))?;
            match patched.get(file.name()) {
                Some(bytes) => {
                    let method = match file.compression() {
                        CompressionMethod::Stored => CompressionMethod::Stored,
                        _ => CompressionMethod::Deflated,
                    };
                    let options = SimpleFileOptions::default().compression_method(method);
                    let name = file.name().to_string();
                    zip.start_file(name, options)?;
                    zip.write_all(bytes).map_err(TemplateError::Write)?;
                }
                None => zip.raw_copy_file(file)?,
            }
        }

        zip.finish()?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, TemplateError> {
        let mut cursor = Cursor::new(Vec::new());
        self.write_to(&mut cursor)?;
        Ok(cursor.into_inner())
    }

    /// Atomically write the package to `path`.
    ///
    /// Fails with [`TemplateError::OutputIsTemplate`] when `path` is the file this template was
    /// opened from.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), TemplateError> {
        let path = path.as_ref();
        if let (Some(origin), Ok(dest)) = (&self.origin, fs::canonicalize(path)) {
            if *origin == dest {
                return Err(TemplateError::OutputIsTemplate(path.to_path_buf()));
            }
        }
        crate::atomic::write_atomic(path, |file| self.write_to(file))?;
        log::debug!("wrote {}", path.display());
        Ok(())
    }
}

fn read_required(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    part: &str,
    budget: &mut InflateBudget,
) -> Result<Vec<u8>, TemplateError> {
    read_part_optional(archive, part, budget)?
        .ok_or_else(|| TemplateError::malformed(part, "required part is missing"))
}

fn text_items(worksheets: &[WorksheetPart], sst: Option<&SharedStringsPart>) -> BTreeSet<u32> {
    let item_count = sst.map_or(0, SharedStringsPart::len);
    let mut text = BTreeSet::new();
    let mut formula = BTreeSet::new();
    for ws in worksheets {
        for scanned in &ws.cells {
            match scanned.content {
                CellContent::SharedString(index) => {
                    if (index as usize) < item_count {
                        text.insert(index);
                    } else {
                        log::debug!(
                            "{}!{} references missing shared string {index}",
                            ws.sheet_name,
                            scanned.cell
                        );
                    }
                }
                CellContent::Formula {
                    shared_string: Some(index),
                    ..
                } => {
                    formula.insert(index);
                }
                _ => {}
            }
        }
    }
    let overlap = text.intersection(&formula).count();
    if overlap > 0 {
        log::warn!(
            "{overlap} shared string(s) are used by both text and formula cells; \
             the formula cells' cached values will change with the text"
        );
    }
    text
}

impl TemplateDocument for XlsxTemplate {
    fn for_each_text_cell(&mut self, rewrite: &mut dyn FnMut(&str) -> Option<String>) -> usize {
        let mut rewritten = 0;
        if let Some(sst) = self.shared_strings.as_mut() {
            for &index in &self.text_items {
                if sst.rewrite(index, rewrite) {
                    rewritten += 1;
                }
            }
        }
        for ws in &mut self.worksheets {
            for index in 0..ws.inline_len() {
                if ws.rewrite_inline(index, rewrite) {
                    rewritten += 1;
                }
            }
        }
        rewritten
    }

    fn for_each_text_value(&self, visit: &mut dyn FnMut(&str)) {
        if let Some(sst) = self.shared_strings.as_ref() {
            for &index in &self.text_items {
                if let Some(text) = sst.text(index) {
                    visit(&text);
                }
            }
        }
        for ws in &self.worksheets {
            for index in 0..ws.inline_len() {
                if let Some(text) = ws.inline_text(index) {
                    visit(&text);
                }
            }
        }
    }

    fn for_each_formula_cell(&self, visit: &mut dyn FnMut(FormulaCell<'_>)) {
        for ws in &self.worksheets {
            for scanned in &ws.cells {
                if let CellContent::Formula { formula, .. } = &scanned.content {
                    visit(FormulaCell {
                        sheet: &ws.sheet_name,
                        cell: scanned.cell,
                        formula,
                    });
                }
            }
        }
    }
}
