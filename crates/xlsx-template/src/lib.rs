//! Template-driven spreadsheet filling.
//!
//! A template is an ordinary `.xlsx` workbook whose text cells contain `##Name##`
//! placeholders. [`substitute`] produces a filled copy by replacing each placeholder whose name
//! has a value in a [`SubstitutionMap`]:
//!
//! - only literal text is rewritten; formula cells are never touched
//! - replacement values are inserted verbatim and never scanned for further placeholders
//! - placeholders without a value stay in the output unchanged
//! - the template itself is never modified, in memory or on disk
//!
//! [`XlsxTemplate`] is the XLSX container. It rewrites only the string parts it has to and
//! copies every other part of the package as-is, so formatting survives the round trip.
//! [`Workbook`] is a plain in-memory document implementing the same [`TemplateDocument`]
//! capability.
//!
//! ```no_run
//! use xlsx_template::{substitute, SubstitutionMap, XlsxTemplate};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let template = XlsxTemplate::open("template.xlsx")?;
//! let map =
//!     SubstitutionMap::try_from_pairs([("Revenue_Q1", "450,000"), ("Status_A", "Completed")])?;
//! let (filled, report) = substitute(&template, &map);
//! filled.save("filled.xlsx")?;
//! println!("{} cell(s) rewritten", report.text_cells_rewritten);
//! # Ok(())
//! # }
//! ```

mod atomic;
mod document;
mod engine;
mod error;
pub mod model;
pub mod placeholder;
mod substitution;
mod xlsx;

pub use document::{FormulaCell, TemplateDocument};
pub use engine::{
    placeholders, substitute, substitute_file, substitute_in_place, SubstitutionReport,
};
pub use error::TemplateError;
pub use model::{Cell, CellRef, Sheet, Workbook};
pub use placeholder::{InvalidPlaceholder, Placeholder};
pub use substitution::SubstitutionMap;
pub use xlsx::{TemplateLimits, XlsxTemplate, DEFAULT_MAX_PART_BYTES, DEFAULT_MAX_TOTAL_BYTES};
