use std::borrow::Cow;
use std::collections::BTreeSet;
use std::path::Path;

use crate::document::TemplateDocument;
use crate::placeholder::placeholders_in;
use crate::substitution::SubstitutionMap;
use crate::xlsx::XlsxTemplate;
use crate::TemplateError;

/// Outcome of one substitution pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubstitutionReport {
    /// Text values inspected.
    pub text_cells_visited: usize,
    /// Text values whose content changed.
    pub text_cells_rewritten: usize,
    /// Formula cells left alone.
    pub formula_cells_skipped: usize,
    /// Placeholder names that appeared in text but had no value.
    pub unresolved: BTreeSet<String>,
}

impl SubstitutionReport {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Fill a copy of `template`; the template itself is left as it was.
pub fn substitute<D>(template: &D, map: &SubstitutionMap) -> (D, SubstitutionReport)
where
    D: TemplateDocument + Clone,
{
    let mut output = template.clone();
    let report = substitute_in_place(&mut output, map);
    (output, report)
}

/// Rewrite every text cell of `document` in place. Formula cells are never touched.
pub fn substitute_in_place<D>(document: &mut D, map: &SubstitutionMap) -> SubstitutionReport
where
    D: TemplateDocument + ?Sized,
{
    let mut report = SubstitutionReport::default();
    document.for_each_formula_cell(&mut |_| report.formula_cells_skipped += 1);

    // Containers may call `rewrite` more than once per value (rich text runs), so visits and
    // unresolved names come from the read-only traversal.
    let mut unresolved = BTreeSet::new();
    document.for_each_text_value(&mut |text| {
        report.text_cells_visited += 1;
        map.apply_recording_unresolved(text, &mut unresolved);
    });
    report.unresolved = unresolved;
    // A value that maps a token onto itself yields an owned copy of the same text.
    report.text_cells_rewritten = document.for_each_text_cell(&mut |text| {
        match map.apply(text) {
            Cow::Owned(new_text) if new_text != text => Some(new_text),
            _ => None,
        }
    });

    log::info!(
        "substituted {} of {} text value(s) using {} placeholder value(s); \
         {} formula cell(s) untouched",
        report.text_cells_rewritten,
        report.text_cells_visited,
        map.len(),
        report.formula_cells_skipped
    );
    if !report.unresolved.is_empty() {
        let names: Vec<&str> = report.unresolved.iter().map(String::as_str).collect();
        log::warn!("no value for placeholder(s): {}", names.join(", "));
    }
    report
}

/// Distinct placeholder names present in the document's text cells.
pub fn placeholders<D>(document: &D) -> BTreeSet<String>
where
    D: TemplateDocument + ?Sized,
{
    let mut names = BTreeSet::new();
    document.for_each_text_value(&mut |text| {
        for name in placeholders_in(text) {
            if !names.contains(name) {
                names.insert(name.to_string());
            }
        }
    });
    names
}

/// Open `template_path`, fill it with `map` and save the result to `output_path`.
pub fn substitute_file(
    template_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    map: &SubstitutionMap,
) -> Result<SubstitutionReport, TemplateError> {
    let template = XlsxTemplate::open(template_path)?;
    let (filled, report) = substitute(&template, map);
    filled.save(output_path)?;
    Ok(report)
}
