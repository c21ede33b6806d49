use crate::model::CellRef;

/// A formula cell as seen by [`TemplateDocument::for_each_formula_cell`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormulaCell<'a> {
    pub sheet: &'a str,
    pub cell: CellRef,
    /// Formula text as stored by the container (XLSX omits the leading `=`).
    pub formula: &'a str,
}

/// Cell traversal capability a spreadsheet container must provide to be filled.
///
/// Text cells are the only substitution targets. Formula cells are exposed read-only so
/// callers can account for them; nothing in this crate ever writes one.
pub trait TemplateDocument {
    /// Visit every literal text value. `rewrite` returns `Some(text)` to replace the value in
    /// full or `None` to keep it. Returns how many values were replaced.
    ///
    /// Containers that share one stored string between several cells may visit it once.
    fn for_each_text_cell(&mut self, rewrite: &mut dyn FnMut(&str) -> Option<String>) -> usize;

    /// Read-only traversal over the same text values as [`Self::for_each_text_cell`].
    fn for_each_text_value(&self, visit: &mut dyn FnMut(&str));

    fn for_each_formula_cell(&self, visit: &mut dyn FnMut(FormulaCell<'_>));
}
