use std::ops::Range;
use std::sync::Arc;

use quick_xml::events::Event;
use quick_xml::Reader;

use super::text::{element_prefix, parse_string_item, position, StringItem};
use crate::TemplateError;

#[derive(Debug, Clone)]
struct Entry {
    /// Byte span of the whole `<si>` element in the original part.
    span: Range<usize>,
    item: StringItem,
    rewritten: Option<StringItem>,
}

/// Parsed `xl/sharedStrings.xml` that re-serializes by splicing rewritten `<si>` items into
/// the original bytes.
#[derive(Debug, Clone)]
pub(crate) struct SharedStringsPart {
    /// Entry name as stored in the package.
    pub entry: String,
    xml: Arc<[u8]>,
    prefix: Option<String>,
    entries: Vec<Entry>,
}

impl SharedStringsPart {
    pub(crate) fn parse(entry: String, xml: Vec<u8>) -> Result<Self, TemplateError> {
        let xml: Arc<[u8]> = xml.into();
        let malformed = |err: &dyn std::fmt::Display| TemplateError::malformed(&entry, err);

        let mut reader = Reader::from_reader(&xml[..]);
        reader.config_mut().trim_text(false);
        let mut buf = Vec::new();
        let mut entries = Vec::new();
        let mut prefix = None;

        loop {
            let before = position(&reader);
            match reader.read_event_into(&mut buf).map_err(|e| malformed(&e))? {
                Event::Start(e) if e.local_name().as_ref() == b"si" => {
                    if entries.is_empty() {
                        prefix = element_prefix(e.name().as_ref());
                    }
                    let item =
                        parse_string_item(&mut reader, &xml, b"si").map_err(|e| malformed(&e))?;
                    entries.push(Entry {
                        span: before..position(&reader),
                        item,
                        rewritten: None,
                    });
                }
                Event::Empty(e) if e.local_name().as_ref() == b"si" => {
                    if entries.is_empty() {
                        prefix = element_prefix(e.name().as_ref());
                    }
                    entries.push(Entry {
                        span: before..position(&reader),
                        item: StringItem::empty(),
                        rewritten: None,
                    });
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(Self {
            entry,
            xml,
            prefix,
            entries,
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Current displayed text of item `index`.
    pub(crate) fn text(&self, index: u32) -> Option<String> {
        let entry = self.entries.get(index as usize)?;
        Some(entry.rewritten.as_ref().unwrap_or(&entry.item).text())
    }

    /// Rewrite item `index`. Returns whether it changed.
    pub(crate) fn rewrite(
        &mut self,
        index: u32,
        rewrite: &mut dyn FnMut(&str) -> Option<String>,
    ) -> bool {
        let Some(entry) = self.entries.get_mut(index as usize) else {
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
        self.entries.iter().any(|entry| entry.rewritten.is_some())
    }

    /// The part with rewritten items spliced in; untouched bytes are copied as-is.
    pub(crate) fn render(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.xml.len());
        let mut cursor = 0;
        for entry in &self.entries {
            let Some(item) = &entry.rewritten else {
                continue;
            };
            out.extend_from_slice(&self.xml[cursor..entry.span.start]);
            item.write_xml(&mut out, self.prefix.as_deref(), "si");
            cursor = entry.span.end;
        }
        out.extend_from_slice(&self.xml[cursor..]);
        out
    }
}
