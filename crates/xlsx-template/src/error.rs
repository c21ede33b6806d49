use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced while opening, filling, or saving a template.
///
/// Substitution itself never fails: unmatched placeholders are inert text. Every variant here
/// comes from reading the template container or writing the output.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template not found: {}: {source}", path.display())]
    TemplateNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed spreadsheet document: {0}")]
    MalformedDocument(String),
    #[error(
        "template part is too large to load safely: {part} is {size} bytes (max {max} bytes)"
    )]
    PartTooLarge { part: String, size: u64, max: u64 },
    #[error("template is too large to load safely: {total} bytes uncompressed (max {max})")]
    PackageTooLarge { total: u64, max: u64 },
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write output document: {0}")]
    Write(#[source] io::Error),
    #[error("refusing to overwrite the template itself: {}", .0.display())]
    OutputIsTemplate(PathBuf),
}

impl TemplateError {
    pub(crate) fn malformed(part: &str, detail: impl std::fmt::Display) -> Self {
        Self::MalformedDocument(format!("{part}: {detail}"))
    }
}

impl From<zip::result::ZipError> for TemplateError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(err) => Self::Write(err),
            other => Self::MalformedDocument(format!("zip error: {other}")),
        }
    }
}
