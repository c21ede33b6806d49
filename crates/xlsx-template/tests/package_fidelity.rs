mod common;

use pretty_assertions::assert_eq;
use xlsx_template::{substitute, Cell, CellRef, SubstitutionMap, XlsxTemplate};

const SHEET: &str = r###"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData><row r="1"><c r="A1" t="s" s="1"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row><row r="2"><c r="A2" t="s"><v>2</v></c><c r="B2" t="inlineStr"><is><t>Inline ##Status_A##</t></is></c></row><row r="3"><c r="A3" t="str"><f>"##Status_A##"</f><v>##Status_A##</v></c><c r="B3" t="s"><f>INDEX(D:D,1)</f><v>3</v></c></row><row r="4"><c r="A4"><f>SUM(A1:A10)</f><v>0</v></c></row></sheetData><mergeCells count="1"><mergeCell ref="C1:D1"/></mergeCells></worksheet>"###;

const SHARED_STRINGS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="4" uniqueCount="4"><si><r><rPr><b/><sz val="11"/></rPr><t>Status: </t></r><r><rPr><i/></rPr><t>##Status_A##</t></r></si><si><r><rPr><b/></rPr><t>##Bud</t></r><r><t>get_A##</t></r></si><si><t>##CEO##</t></si><si><t>formula only ##CEO##</t></si></sst>"#;

fn values() -> SubstitutionMap {
    SubstitutionMap::try_from_pairs([
        ("Status_A", "Done"),
        ("Budget_A", "75,000"),
        ("CEO", " John Smith "),
    ])
    .expect("valid names")
}

#[test]
fn splices_rewritten_strings_and_copies_everything_else() {
    let input = common::package(SHEET, SHARED_STRINGS);
    let template = XlsxTemplate::from_bytes(input.clone()).expect("open");
    let (filled, report) = substitute(&template, &values());

    assert_eq!(report.text_cells_visited, 4);
    assert_eq!(report.text_cells_rewritten, 4);
    assert_eq!(report.formula_cells_skipped, 3);
    assert!(report.is_complete());

    let output = filled.to_bytes().expect("serialize");
    let expected_sst = SHARED_STRINGS
        .replace(
            r#"<t>Status: </t></r><r><rPr><i/></rPr><t>##Status_A##</t>"#,
            r#"<t xml:space="preserve">Status: </t></r><r><rPr><i/></rPr><t>Done</t>"#,
        )
        .replace(
            r#"<si><r><rPr><b/></rPr><t>##Bud</t></r><r><t>get_A##</t></r></si>"#,
            r#"<si><r><rPr><b/></rPr><t>75,000</t></r></si>"#,
        )
        .replace(
            r#"<si><t>##CEO##</t></si>"#,
            r#"<si><t xml:space="preserve"> John Smith </t></si>"#,
        );
    assert_eq!(common::zip_part(&output, "xl/sharedStrings.xml"), expected_sst);
    assert_eq!(
        common::zip_part(&output, "xl/worksheets/sheet1.xml"),
        SHEET.replace(
            "<is><t>Inline ##Status_A##</t></is>",
            "<is><t>Inline Done</t></is>"
        )
    );

    // Untouched parts come through byte-for-byte and in the original order.
    let before = common::zip_entries(&input);
    let after = common::zip_entries(&output);
    let names = |entries: &[(String, Vec<u8>)]| -> Vec<String> {
        entries.iter().map(|(name, _)| name.clone()).collect()
    };
    assert_eq!(names(&after), names(&before));
    for ((name, old), (_, new)) in before.iter().zip(&after) {
        if name != "xl/sharedStrings.xml" && name != "xl/worksheets/sheet1.xml" {
            assert_eq!(old, new, "{name} changed");
        }
    }
}

#[test]
fn decodes_cells_after_substitution() {
    let template = XlsxTemplate::from_bytes(common::package(SHEET, SHARED_STRINGS)).expect("open");
    let (filled, _) = substitute(&template, &values());
    let workbook = filled.to_workbook();
    let sheet = workbook.sheet("Data").expect("sheet");

    assert_eq!(sheet.get_a1("A1"), Some(&Cell::text("Status: Done")));
    assert_eq!(sheet.get_a1("B1"), Some(&Cell::text("75,000")));
    assert_eq!(sheet.get_a1("A2"), Some(&Cell::text(" John Smith ")));
    assert_eq!(sheet.get_a1("B2"), Some(&Cell::text("Inline Done")));
    assert_eq!(
        sheet.get_a1("A3"),
        Some(&Cell::Formula {
            formula: "\"##Status_A##\"".to_string(),
            cached: Some("##Status_A##".to_string()),
        })
    );
    assert_eq!(
        sheet.get(CellRef::new(2, 1)),
        Some(&Cell::Formula {
            formula: "INDEX(D:D,1)".to_string(),
            cached: Some("formula only ##CEO##".to_string()),
        })
    );
}

#[test]
fn shared_item_used_by_text_and_formula_is_still_filled() {
    let sheet = SHEET.replace(
        r#"<c r="B3" t="s"><f>INDEX(D:D,1)</f><v>3</v></c>"#,
        r#"<c r="B3" t="s"><f>INDEX(D:D,1)</f><v>2</v></c>"#,
    );
    let template = XlsxTemplate::from_bytes(common::package(&sheet, SHARED_STRINGS)).expect("open");
    let (filled, _) = substitute(&template, &values());
    let workbook = filled.to_workbook();
    let data = workbook.sheet("Data").expect("sheet");
    assert_eq!(data.get_a1("A2"), Some(&Cell::text(" John Smith ")));
}

#[test]
fn reopened_output_is_a_valid_template() {
    let template = XlsxTemplate::from_bytes(common::package(SHEET, SHARED_STRINGS)).expect("open");
    let (filled, _) = substitute(&template, &values());
    let reopened = XlsxTemplate::from_bytes(filled.to_bytes().expect("serialize")).expect("reopen");
    assert_eq!(reopened.to_workbook(), filled.to_workbook());
}

#[test]
fn workbook_without_shared_strings_uses_inline_strings_only() {
    let sheet = r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData><row r="1"><c r="A1" t="inlineStr"><is><r><t>##Status_A##</t></r></is></c></row></sheetData></worksheet>"#;
    let bytes = common::build_zip_bytes(&[
        ("[Content_Types].xml", common::CONTENT_TYPES.as_bytes()),
        ("xl/workbook.xml", common::WORKBOOK.as_bytes()),
        (
            "xl/_rels/workbook.xml.rels",
            br#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#
                .as_slice(),
        ),
        ("xl/worksheets/sheet1.xml", sheet.as_bytes()),
    ]);
    let template = XlsxTemplate::from_bytes(bytes).expect("open");
    let (filled, report) = substitute(&template, &values());
    assert_eq!(report.text_cells_rewritten, 1);
    assert_eq!(
        common::zip_part(&filled.to_bytes().unwrap(), "xl/worksheets/sheet1.xml"),
        sheet.replace("<r><t>##Status_A##</t></r>", "<r><t>Done</t></r>")
    );
}

#[test]
fn formula_less_str_cell_is_filled_as_text() {
    let sheet = r###"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData><row r="1"><c r="A1" t="str"><v>Status: ##Status_A##</v></c><c r="B1" t="str"><f>"##Status_A##"</f><v>##Status_A##</v></c></row></sheetData></worksheet>"###;
    let template = XlsxTemplate::from_bytes(common::package(sheet, SHARED_STRINGS)).expect("open");
    let (filled, report) = substitute(&template, &values());
    assert_eq!(report.text_cells_rewritten, 1);
    assert_eq!(report.formula_cells_skipped, 1);

    let workbook = filled.to_workbook();
    let data = workbook.sheet("Data").expect("sheet");
    assert_eq!(data.get_a1("A1"), Some(&Cell::text("Status: Done")));
    assert_eq!(
        common::zip_part(&filled.to_bytes().expect("serialize"), "xl/worksheets/sheet1.xml"),
        sheet.replace("<v>Status: ##Status_A##</v>", "<v>Status: Done</v>")
    );
}

#[test]
fn self_mapping_value_leaves_the_package_untouched() {
    let input = common::package(SHEET, SHARED_STRINGS);
    let template = XlsxTemplate::from_bytes(input).expect("open");
    let map = SubstitutionMap::try_from_pairs([("Status_A", "##Status_A##")]).expect("valid");
    let (filled, report) = substitute(&template, &map);
    assert_eq!(report.text_cells_rewritten, 0);
    assert_eq!(
        filled.to_bytes().expect("serialize"),
        template.to_bytes().expect("serialize")
    );
}
