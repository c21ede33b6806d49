#![allow(dead_code)]

use std::io::{Cursor, Read, Write};

use rust_xlsxwriter::Workbook;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/></Types>"#;

pub const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

pub const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Data" sheetId="1" r:id="rId1"/></sheets></workbook>"#;

pub const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

pub const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="2"><font><sz val="11"/><name val="Calibri"/></font><font><b/><sz val="11"/><name val="Calibri"/></font></fonts></styleSheet>"#;

pub fn build_zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let cursor = Cursor::new(Vec::new());
    let mut zip = ZipWriter::new(cursor);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, bytes) in entries {
        zip.start_file(*name, options).expect("start zip entry");
        zip.write_all(bytes).expect("write zip entry");
    }
    zip.finish().expect("finish zip").into_inner()
}

/// A one-sheet package (`Data`) with the given worksheet and shared strings XML.
pub fn package(sheet_xml: &str, shared_strings_xml: &str) -> Vec<u8> {
    build_zip_bytes(&[
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
        ("_rels/.rels", ROOT_RELS.as_bytes()),
        ("xl/workbook.xml", WORKBOOK.as_bytes()),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.as_bytes()),
        ("xl/worksheets/sheet1.xml", sheet_xml.as_bytes()),
        ("xl/sharedStrings.xml", shared_strings_xml.as_bytes()),
        ("xl/styles.xml", STYLES.as_bytes()),
    ])
}

/// Every entry of a ZIP package, decompressed, in stored order.
pub fn zip_entries(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("open zip");
    let mut out = Vec::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).expect("zip entry");
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).expect("read zip entry");
        out.push((file.name().to_string(), buf));
    }
    out
}

pub fn zip_part(bytes: &[u8], name: &str) -> String {
    zip_entries(bytes)
        .into_iter()
        .find(|(entry, _)| entry == name)
        .map(|(_, data)| String::from_utf8(data).expect("utf-8 part"))
        .unwrap_or_else(|| panic!("missing part {name}"))
}

/// The demo layout: labelled placeholders, the quarterly table, a project table and a
/// formula row.
pub fn demo_template() -> Workbook {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Data").expect("sheet name");

    let labels = [
        ("Vehicle Registration", "##VehicleRegistration##"),
        ("Dashboard", "##Dashboard##"),
        ("Defect Description", "##DefectDescription##"),
        ("Date", "##Date##"),
    ];
    for (row, (label, token)) in labels.iter().enumerate() {
        sheet.write_string(row as u32, 0, *label).expect("label");
        sheet.write_string(row as u32, 1, *token).expect("token");
    }

    for (col, header) in ["Quarter", "Revenue", "Profit", "Costs", "Margin (%)"]
        .iter()
        .enumerate()
    {
        sheet.write_string(5, col as u16, *header).expect("header");
    }
    for q in 1..=4u32 {
        let row = 5 + q;
        sheet.write_string(row, 0, format!("Q{q}")).expect("quarter");
        for (col, metric) in ["Revenue", "Profit", "Costs", "Margin"].iter().enumerate() {
            sheet
                .write_string(row, col as u16 + 1, format!("##{metric}_Q{q}##"))
                .expect("metric");
        }
    }

    sheet
        .write_string(11, 0, "Revenue: ##Revenue_Q1##, Status: ##Status_A##")
        .expect("summary");
    sheet.write_formula(12, 0, "=SUM(A1:A10)").expect("formula");
    sheet
        .write_formula(12, 1, "=\"##Status_A##\"")
        .expect("string formula");
    workbook
}

pub fn demo_template_bytes() -> Vec<u8> {
    demo_template().save_to_buffer().expect("save template")
}
