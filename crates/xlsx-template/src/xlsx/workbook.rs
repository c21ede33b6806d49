use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::TemplateError;

pub(crate) const WORKBOOK_PART: &str = "xl/workbook.xml";
pub(crate) const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
pub(crate) const DEFAULT_SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

const REL_TYPE_WORKSHEET_SUFFIX: &str = "/relationships/worksheet";
const REL_TYPE_SHARED_STRINGS_SUFFIX: &str = "/relationships/sharedStrings";

/// `<sheet>` entry of `xl/workbook.xml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WorkbookSheet {
    pub name: String,
    pub rel_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Relationship {
    pub id: String,
    pub type_uri: String,
    pub target: String,
    pub external: bool,
}

/// A worksheet with its resolved part name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SheetPart {
    pub name: String,
    pub part: String,
}

pub(crate) fn parse_workbook_sheets(xml: &[u8]) -> Result<Vec<WorkbookSheet>, TemplateError> {
    let malformed = |err: &dyn std::fmt::Display| TemplateError::malformed(WORKBOOK_PART, err);

    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut sheets = Vec::new();
    let mut saw_workbook = false;

    loop {
        match reader.read_event_into(&mut buf).map_err(|e| malformed(&e))? {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"workbook" => saw_workbook = true,
                b"sheet" => sheets.push(parse_sheet_element(&e)?),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !saw_workbook {
        return Err(malformed(&"missing <workbook> root element"));
    }
    Ok(sheets)
}

fn parse_sheet_element(e: &BytesStart<'_>) -> Result<WorkbookSheet, TemplateError> {
    let mut name = None;
    let mut rel_id = None;
    for attr in e.attributes() {
        let attr = attr.map_err(|err| TemplateError::malformed(WORKBOOK_PART, err))?;
        let value = attr
            .unescape_value()
            .map_err(|err| TemplateError::malformed(WORKBOOK_PART, err))?;
        match attr.key.as_ref() {
            b"name" => name = Some(value.into_owned()),
            key if local_name(key) == b"id" => rel_id = Some(value.into_owned()),
            _ => {}
        }
    }
    match (name, rel_id) {
        (Some(name), Some(rel_id)) => Ok(WorkbookSheet { name, rel_id }),
        _ => Err(TemplateError::malformed(
            WORKBOOK_PART,
            "<sheet> is missing its name or r:id attribute",
        )),
    }
}

pub(crate) fn parse_relationships(
    part: &str,
    xml: &[u8],
) -> Result<Vec<Relationship>, TemplateError> {
    let malformed = |err: &dyn std::fmt::Display| TemplateError::malformed(part, err);

    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut relationships = Vec::new();

    loop {
        match reader.read_event_into(&mut buf).map_err(|e| malformed(&e))? {
            Event::Start(e) | Event::Empty(e)
                if local_name(e.name().as_ref()).eq_ignore_ascii_case(b"Relationship") =>
            {
                let mut id = None;
                let mut target = None;
                let mut type_uri = None;
                let mut external = false;
                for attr in e.attributes() {
                    let attr = attr.map_err(|err| malformed(&err))?;
                    let value = attr.unescape_value().map_err(|err| malformed(&err))?;
                    let key = local_name(attr.key.as_ref());
                    if key.eq_ignore_ascii_case(b"Id") {
                        id = Some(value.into_owned());
                    } else if key.eq_ignore_ascii_case(b"Target") {
                        target = Some(value.into_owned());
                    } else if key.eq_ignore_ascii_case(b"Type") {
                        type_uri = Some(value.into_owned());
                    } else if key.eq_ignore_ascii_case(b"TargetMode") {
                        external = value.trim().eq_ignore_ascii_case("External");
                    }
                }
                if let (Some(id), Some(target), Some(type_uri)) = (id, target, type_uri) {
                    relationships.push(Relationship {
                        id,
                        type_uri,
                        target,
                        external,
                    });
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(relationships)
}

/// Resolve each `<sheet>` to its worksheet part through the workbook relationships.
///
/// Chartsheets and dialog sheets carry no cells and are skipped.
pub(crate) fn resolve_sheet_parts(
    sheets: Vec<WorkbookSheet>,
    relationships: &[Relationship],
) -> Result<Vec<SheetPart>, TemplateError> {
    let mut out = Vec::with_capacity(sheets.len());
    for sheet in sheets {
        let rel = relationships
            .iter()
            .find(|rel| rel.id == sheet.rel_id)
            .ok_or_else(|| {
                TemplateError::malformed(
                    WORKBOOK_RELS_PART,
                    format!("missing relationship {} for sheet {:?}", sheet.rel_id, sheet.name),
                )
            })?;
        if rel.external || !rel.type_uri.ends_with(REL_TYPE_WORKSHEET_SUFFIX) {
            log::debug!("skipping non-worksheet sheet {:?} ({})", sheet.name, rel.type_uri);
            continue;
        }
        out.push(SheetPart {
            name: sheet.name,
            part: resolve_target(WORKBOOK_PART, &rel.target),
        });
    }
    Ok(out)
}

/// The shared strings part named by the workbook relationships, if any.
pub(crate) fn shared_strings_target(relationships: &[Relationship]) -> Option<String> {
    relationships
        .iter()
        .find(|rel| !rel.external && rel.type_uri.ends_with(REL_TYPE_SHARED_STRINGS_SUFFIX))
        .map(|rel| resolve_target(WORKBOOK_PART, &rel.target))
}

/// Resolve a relationship target against the part that owns the relationship.
pub(crate) fn resolve_target(source_part: &str, target: &str) -> String {
    // Part names carry no URI fragment.
    let target = target.split('#').next().unwrap_or(target);
    if target.is_empty() {
        return normalize(source_part);
    }
    if let Some(absolute) = target.strip_prefix('/') {
        return normalize(absolute);
    }
    let base_dir = source_part.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
    normalize(&format!("{base_dir}/{target}"))
}

fn normalize(path: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out.join("/")
}

pub(crate) fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().rposition(|b| *b == b':') {
        Some(idx) => &name[idx + 1..],
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORKBOOK: &[u8] = br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"
          xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets>
    <sheet name="Data" sheetId="1" r:id="rId1"/>
    <sheet name="Chart" sheetId="2" r:id="rId3"/>
    <sheet name="Q&amp;A" sheetId="3" r:id="rId4"/>
  </sheets>
</workbook>"#;

    const RELS: &[u8] = br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>
  <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/chartsheet" Target="chartsheets/sheet1.xml"/>
  <Relationship Id="rId4" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="/xl/worksheets/sheet2.xml"/>
</Relationships>"#;

    #[test]
    fn resolves_worksheet_parts_in_workbook_order() {
        let sheets = parse_workbook_sheets(WORKBOOK).expect("workbook");
        let rels = parse_relationships(WORKBOOK_RELS_PART, RELS).expect("rels");
        let parts = resolve_sheet_parts(sheets, &rels).expect("resolve");
        assert_eq!(
            parts,
            vec![
                SheetPart {
                    name: "Data".to_string(),
                    part: "xl/worksheets/sheet1.xml".to_string(),
                },
                SheetPart {
                    name: "Q&A".to_string(),
                    part: "xl/worksheets/sheet2.xml".to_string(),
                },
            ]
        );
        assert_eq!(
            shared_strings_target(&rels).as_deref(),
            Some("xl/sharedStrings.xml")
        );
    }

    #[test]
    fn missing_relationship_is_malformed() {
        let sheets = parse_workbook_sheets(WORKBOOK).expect("workbook");
        let err = resolve_sheet_parts(sheets, &[]).unwrap_err();
        assert!(matches!(err, TemplateError::MalformedDocument(_)), "{err}");
    }

    #[test]
    fn non_workbook_xml_is_malformed() {
        let err = parse_workbook_sheets(b"<html/>").unwrap_err();
        assert!(matches!(err, TemplateError::MalformedDocument(_)), "{err}");
    }

    #[test]
    fn resolve_target_handles_relative_absolute_and_fragments() {
        assert_eq!(
            resolve_target("xl/workbook.xml", "worksheets/sheet1.xml#rId1"),
            "xl/worksheets/sheet1.xml"
        );
        assert_eq!(
            resolve_target("xl/workbook.xml", "/xl/../xl/sharedStrings.xml"),
            "xl/sharedStrings.xml"
        );
        assert_eq!(
            resolve_target("xl/worksheets/sheet1.xml", "./../worksheets/./sheet2.xml"),
            "xl/worksheets/sheet2.xml"
        );
    }
}
