//! Atomic output files: write to a temp file next to the destination, sync it, then rename
//! it into place. A failed write leaves the destination untouched and no temp file behind.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::TemplateError;

fn parent_dir_or_dot(path: &Path) -> &Path {
    // `Path::parent` is `Some("")` for bare file names like `out.xlsx`.
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Run `write_fn` against a temp file in `dest`'s directory and move the result to `dest`.
///
/// Missing parent directories are created. Errors from `write_fn` are returned unchanged;
/// filesystem errors become [`TemplateError::Io`] naming `dest`.
pub(crate) fn write_atomic(
    dest: &Path,
    write_fn: impl FnOnce(&mut File) -> Result<(), TemplateError>,
) -> Result<(), TemplateError> {
    let io_err = |source: io::Error| TemplateError::Io {
        path: dest.to_path_buf(),
        source,
    };

    let dir = parent_dir_or_dot(dest);
    fs::create_dir_all(dir).map_err(io_err)?;

    // Dropping `tmp` on any early return deletes the temp file.
    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    write_fn(tmp.as_file_mut()).map_err(|err| match err {
        TemplateError::Write(source) => io_err(source),
        other => other,
    })?;

    tmp.as_file_mut().flush().map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;

    // `persist` replaces an existing destination on every platform.
    tmp.persist(dest).map_err(|err| io_err(err.error))?;

    if let Err(err) = sync_parent_dir(dest) {
        log::debug!("could not sync directory of {}: {err}", dest.display());
    }
    Ok(())
}

fn sync_parent_dir(path: &Path) -> io::Result<()> {
    File::open(parent_dir_or_dot(path))?.sync_all()
}
