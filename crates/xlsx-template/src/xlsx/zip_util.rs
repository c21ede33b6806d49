use std::io::{Read, Seek};

use zip::ZipArchive;

use crate::TemplateError;

/// Default ceiling on the uncompressed size of any single part read into memory.
pub const DEFAULT_MAX_PART_BYTES: u64 = 256 * 1024 * 1024; // 256MiB

/// Default ceiling on the total uncompressed bytes read while opening a template.
pub const DEFAULT_MAX_TOTAL_BYTES: u64 = 512 * 1024 * 1024; // 512MiB

/// Size limits enforced by [`crate::XlsxTemplate::from_bytes_limited`].
///
/// Only the parts the engine inspects (workbook, relationships, shared strings, worksheets)
/// are inflated; everything else is copied through without decompression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateLimits {
    pub max_part_bytes: u64,
    pub max_total_bytes: u64,
}

impl Default for TemplateLimits {
    fn default() -> Self {
        Self {
            max_part_bytes: DEFAULT_MAX_PART_BYTES,
            max_total_bytes: DEFAULT_MAX_TOTAL_BYTES,
        }
    }
}

/// Running total of inflated bytes across one open.
#[derive(Debug, Clone)]
pub(crate) struct InflateBudget {
    limits: TemplateLimits,
    used_bytes: u64,
}

impl InflateBudget {
    pub(crate) fn new(limits: TemplateLimits) -> Self {
        Self {
            limits,
            used_bytes: 0,
        }
    }

    fn remaining_bytes(&self) -> u64 {
        self.limits.max_total_bytes.saturating_sub(self.used_bytes)
    }

    fn too_large(&self, extra: u64) -> TemplateError {
        TemplateError::PackageTooLarge {
            total: self.used_bytes.saturating_add(extra),
            max: self.limits.max_total_bytes,
        }
    }
}

/// Read a ZIP part by name, returning `Ok(None)` when the entry does not exist.
pub(crate) fn read_part_optional<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
    budget: &mut InflateBudget,
) -> Result<Option<Vec<u8>>, TemplateError> {
    let Some(stored) = stored_part_name(archive, name) else {
        return Ok(None);
    };
    let mut file = archive
        .by_name(&stored)
        .map_err(|err| TemplateError::malformed(name, err))?;
    if file.is_dir() {
        return Ok(None);
    }
    let declared = file.size();
    read_file_with_budget(&mut file, declared, name, budget).map(Some)
}

/// Resolve a canonical part name (`xl/workbook.xml`) to the entry name actually stored.
///
/// Tolerates a leading `/`, `\` separators and ASCII case differences, which some producers
/// emit. An exact match always wins.
pub(crate) fn stored_part_name<R: Read + Seek>(
    archive: &ZipArchive<R>,
    name: &str,
) -> Option<String> {
    if archive.file_names().any(|entry| entry == name) {
        return Some(name.to_string());
    }
    let wanted = canonical_part_name(name);
    archive
        .file_names()
        .find(|entry| canonical_part_name(entry) == wanted)
        .map(str::to_string)
}

/// Lowercased, `/`-separated part name without leading separators.
pub(crate) fn canonical_part_name(name: &str) -> String {
    name.trim_start_matches(['/', '\\'])
        .replace('\\', "/")
        .to_ascii_lowercase()
}

/// Inflate one entry without trusting its declared size: reads at most `limit + 1` bytes and
/// errors when more than `limit` are observed.
fn read_file_with_budget<R: Read>(
    file: &mut R,
    declared: u64,
    part: &str,
    budget: &mut InflateBudget,
) -> Result<Vec<u8>, TemplateError> {
    let max_part = budget.limits.max_part_bytes;
    let remaining = budget.remaining_bytes();
    let effective_max = max_part.min(remaining);
    let limit_is_total = effective_max < max_part;

    if declared > max_part {
        return Err(TemplateError::PartTooLarge {
            part: part.to_string(),
            size: declared,
            max: max_part,
        });
    }
    if limit_is_total && declared > effective_max {
        return Err(budget.too_large(declared));
    }

    let mut buf = Vec::new();
    file.take(effective_max.saturating_add(1))
        .read_to_end(&mut buf)
        .map_err(|err| TemplateError::malformed(part, err))?;

    let observed = buf.len() as u64;
    if observed > effective_max {
        if limit_is_total {
            return Err(budget.too_large(observed));
        }
        return Err(TemplateError::PartTooLarge {
            part: part.to_string(),
            size: observed,
            max: max_part,
        });
    }

    budget.used_bytes = budget.used_bytes.saturating_add(observed);
    Ok(buf)
}
