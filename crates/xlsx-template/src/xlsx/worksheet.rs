use std::ops::Range;
use std::sync::Arc;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::text::{
    element_prefix, parse_string_item, position, read_element_text, write_text_element,
    StringItem,
};
use crate::model::CellRef;
use crate::TemplateError;

/// What a scanned `<c>` element holds, as far as substitution is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CellContent {
    /// `t="s"`: index into the shared strings table.
    SharedString(u32),
    /// `t="inlineStr"`, or `t="str"` without a formula: index into [`WorksheetPart::inline`].
    Inline(usize),
    Formula {
        formula: String,
        /// Raw `<v>` value; a shared string index when `shared_string` is set.
        cached: Option<String>,
        shared_string: Option<u32>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ScannedCell {
    pub cell: CellRef,
    pub content: CellContent,
}

/// Element holding a cell-local string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InlineElement {
    /// `<is>` of a `t="inlineStr"` cell.
    InlineString,
    /// `<v>` of a literal `t="str"` cell.
    CellValue,
}

#[derive(Debug, Clone)]
struct InlineEntry {
    /// Byte span of the `<is>` or `<v>` element.
    span: Range<usize>,
    element: InlineElement,
    item: StringItem,
    rewritten: Option<StringItem>,
}

/// One worksheet part: the cells relevant to substitution, plus enough positional
/// information to splice rewritten inline strings back into the original XML.
#[derive(Debug, Clone)]
pub(crate) struct WorksheetPart {
    pub sheet_name: String,
    /// Entry name as stored in the package.
    pub entry: String,
    pub cells: Vec<ScannedCell>,
    xml: Arc<[u8]>,
    inline: Vec<InlineEntry>,
}

#[derive(Default)]
struct CellAttrs {
    reference: Option<String>,
    cell_type: Option<String>,
}

impl WorksheetPart {
    pub(crate) fn parse(
        sheet_name: String,
        entry: String,
        xml: Vec<u8>,
    ) -> Result<Self, TemplateError> {
        let xml: Arc<[u8]> = xml.into();
        let malformed = |err: &dyn std::fmt::Display| TemplateError::malformed(&entry, err);

        let mut reader = Reader::from_reader(&xml[..]);
        reader.config_mut().trim_text(false);
        let mut buf = Vec::new();
        let mut cells = Vec::new();
        let mut inline = Vec::new();

        // Rows and cells may omit `r`; fall back to document order.
        let mut next_row: u32 = 0;
        let mut current_row: u32 = 0;
        let mut next_col: u32 = 0;

        loop {
            match reader.read_event_into(&mut buf).map_err(|e| malformed(&e))? {
                Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"row" => {
                    current_row = row_number(&e)
                        .map_err(|e| malformed(&e))?
                        .unwrap_or(next_row);
                    next_row = current_row.saturating_add(1);
                    next_col = 0;
                }
                Event::Empty(e) if e.local_name().as_ref() == b"c" => {
                    let attrs = cell_attrs(&e).map_err(|e| malformed(&e))?;
                    let cell = resolve_cell(attrs.reference.as_deref(), current_row, next_col)
                        .map_err(|e| malformed(&e))?;
                    next_col = cell.col.saturating_add(1);
                }
                Event::Start(e) if e.local_name().as_ref() == b"c" => {
                    let attrs = cell_attrs(&e).map_err(|e| malformed(&e))?;
                    let cell = resolve_cell(attrs.reference.as_deref(), current_row, next_col)
                        .map_err(|e| malformed(&e))?;
                    next_col = cell.col.saturating_add(1);

                    let body = scan_cell_body(&mut reader, &xml).map_err(|e| malformed(&e))?;
                    if let Some(content) =
                        classify(cell, attrs.cell_type.as_deref(), body, &mut inline)
                    {
                        cells.push(ScannedCell { cell, content });
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(Self {
            sheet_name,
            entry,
            cells,
            xml,
            inline,
        })
    }

    pub(crate) fn inline_len(&self) -> usize {
        self.inline.len()
    }

    pub(crate) fn inline_text(&self, index: usize) -> Option<String> {
        let entry = self.inline.get(index)?;
        Some(entry.rewritten.as_ref().unwrap_or(&entry.item).text())
    }

    pub(crate) fn rewrite_inline(
        &mut self,
        index: usize,
        rewrite: &mut dyn FnMut(&str) -> Option<String>,
    ) -> bool {
        let Some(entry) = self.inline.get_mut(index) else {
            return false;
        };
        let current = entry.rewritten.as_ref().unwrap_or(&entry.item);
        match current.rewritten(rewrite) {
            Some(item) => {
                entry.rewritten = Some(item);
                true
            }
            None => false,
        }
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.inline.iter().any(|entry| entry.rewritten.is_some())
    }

    pub(crate) fn render(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.xml.len());
        let mut cursor = 0;
        for entry in &self.inline {
            let Some(item) = &entry.rewritten else {
                continue;
            };
            let prefix = element_prefix(
                self.xml[entry.span.start + 1..entry.span.end]
                    .split(|b| matches!(b, b'>' | b'/' | b' ' | b'\t' | b'\r' | b'\n'))
                    .next()
                    .unwrap_or_default(),
            );
            out.extend_from_slice(&self.xml[cursor..entry.span.start]);
            match entry.element {
                InlineElement::InlineString => item.write_xml(&mut out, prefix.as_deref(), "is"),
                InlineElement::CellValue => {
                    write_text_element(&mut out, prefix.as_deref(), "v", &item.text())
                }
            }
            cursor = entry.span.end;
        }
        out.extend_from_slice(&self.xml[cursor..]);
        out
    }
}

#[derive(Default)]
struct CellBody {
    formula: Option<String>,
    value: Option<(Range<usize>, String)>,
    inline: Option<(Range<usize>, StringItem)>,
}

fn scan_cell_body(reader: &mut Reader<&[u8]>, xml: &[u8]) -> Result<CellBody, quick_xml::Error> {
    let mut buf = Vec::new();
    let mut body = CellBody::default();

    loop {
        let before = position(reader);
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"f" => body.formula = Some(read_element_text(reader, b"f")?),
                b"v" => {
                    let text = read_element_text(reader, b"v")?;
                    body.value = Some((before..position(reader), text));
                }
                b"is" => {
                    let item = parse_string_item(reader, xml, b"is")?;
                    body.inline = Some((before..position(reader), item));
                }
                _ => {
                    reader.read_to_end_into(e.name(), &mut Vec::new())?;
                }
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                // Shared formula followers: `<f t="shared" si="0"/>`.
                b"f" => body.formula = Some(String::new()),
                b"v" => body.value = Some((before..position(reader), String::new())),
                b"is" => body.inline = Some((before..position(reader), StringItem::empty())),
                _ => {}
            },
            Event::End(e) if e.local_name().as_ref() == b"c" => break,
            Event::Eof => {
                return Err(quick_xml::Error::Syntax(
                    quick_xml::errors::SyntaxError::UnclosedTag,
                ))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(body)
}

fn classify(
    cell: CellRef,
    cell_type: Option<&str>,
    body: CellBody,
    inline: &mut Vec<InlineEntry>,
) -> Option<CellContent> {
    if let Some(formula) = body.formula {
        let cached = body.value.map(|(_, value)| value);
        let shared_string = match cell_type {
            Some("s") => cached.as_deref().and_then(|v| v.trim().parse().ok()),
            _ => None,
        };
        return Some(CellContent::Formula {
            formula,
            cached,
            shared_string,
        });
    }

    match cell_type {
        Some("s") => {
            let (_, raw) = body.value?;
            match raw.trim().parse::<u32>() {
                Ok(index) => Some(CellContent::SharedString(index)),
                Err(_) => {
                    log::debug!("cell {cell}: ignoring non-numeric shared string index {raw:?}");
                    None
                }
            }
        }
        Some("inlineStr") => {
            let (span, item) = body.inline?;
            inline.push(InlineEntry {
                span,
                element: InlineElement::InlineString,
                item,
                rewritten: None,
            });
            Some(CellContent::Inline(inline.len() - 1))
        }
        // Formula-less `str` cells are literal text some producers write instead of inlineStr.
        Some("str") => {
            let (span, text) = body.value?;
            inline.push(InlineEntry {
                span,
                element: InlineElement::CellValue,
                item: StringItem::plain(text),
                rewritten: None,
            });
            Some(CellContent::Inline(inline.len() - 1))
        }
        _ => None,
    }
}

fn row_number(e: &BytesStart<'_>) -> Result<Option<u32>, String> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| err.to_string())?;
        if attr.key.as_ref() == b"r" {
            let value = attr.unescape_value().map_err(|err| err.to_string())?;
            let row: u32 = value
                .trim()
                .parse()
                .map_err(|_| format!("invalid row number {value:?}"))?;
            if row == 0 {
                return Err("row numbers start at 1".to_string());
            }
            return Ok(Some(row - 1));
        }
    }
    Ok(None)
}

fn cell_attrs(e: &BytesStart<'_>) -> Result<CellAttrs, String> {
    let mut attrs = CellAttrs::default();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| err.to_string())?;
        let value = attr.unescape_value().map_err(|err| err.to_string())?;
        match attr.key.as_ref() {
            b"r" => attrs.reference = Some(value.into_owned()),
            b"t" => attrs.cell_type = Some(value.into_owned()),
            _ => {}
        }
    }
    Ok(attrs)
}

fn resolve_cell(reference: Option<&str>, row: u32, col: u32) -> Result<CellRef, String> {
    match reference {
        Some(a1) => CellRef::from_a1(a1).map_err(|err| format!("cell {a1:?}: {err}")),
        None => Ok(CellRef::new(row, col)),
    }
}
