//! The demo template: labelled placeholders, a quarterly figures table, a project table and a
//! formula row that filling must leave alone.

use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Format, Workbook, XlsxError};

pub const SHEET_NAME: &str = "Data";

const DETAILS: &[(&str, &str)] = &[
    ("Vehicle Registration", "##VehicleRegistration##"),
    ("Dashboard", "##Dashboard##"),
    ("Defect Description", "##DefectDescription##"),
    ("Date", "##Date##"),
];

const COMPANY: &[(&str, &str)] = &[
    ("Company Name", "##CompanyName##"),
    ("CEO", "##CEO##"),
    ("Location", "##Location##"),
    ("Employees", "##Employees##"),
    ("Year", "##Year##"),
    ("Remarks", "##Remarks##"),
];

const QUARTER_HEADERS: &[&str] = &["Quarter", "Revenue", "Profit", "Costs", "Margin (%)"];
const QUARTER_METRICS: &[&str] = &["Revenue", "Profit", "Costs", "Margin"];
const PROJECT_HEADERS: &[&str] = &["Project", "Status", "Budget"];

pub fn demo_workbook() -> Result<Workbook, XlsxError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;
    sheet.set_column_width(0, 22)?;
    sheet.set_column_width(1, 26)?;
    sheet.set_column_width(6, 16)?;
    sheet.set_column_width(7, 40)?;

    for (row, (label, token)) in (0u32..).zip(DETAILS) {
        sheet.write_string_with_format(row, 0, *label, &bold)?;
        sheet.write_string(row, 1, *token)?;
    }
    for (row, (label, token)) in (0u32..).zip(COMPANY) {
        sheet.write_string_with_format(row, 6, *label, &bold)?;
        sheet.write_string(row, 7, *token)?;
    }

    for (col, header) in (0u16..).zip(QUARTER_HEADERS) {
        sheet.write_string_with_format(5, col, *header, &bold)?;
    }
    for quarter in 1..=4u32 {
        let row = 5 + quarter;
        sheet.write_string(row, 0, format!("Q{quarter}"))?;
        for (col, metric) in (1u16..).zip(QUARTER_METRICS) {
            sheet.write_string(row, col, format!("##{metric}_Q{quarter}##"))?;
        }
    }

    for (col, header) in (0u16..).zip(PROJECT_HEADERS) {
        sheet.write_string_with_format(11, col, *header, &bold)?;
    }
    for (row, project) in (12u32..).zip(["A", "B", "C"]) {
        sheet.write_string(row, 0, project)?;
        sheet.write_string(row, 1, format!("##Status_{project}##"))?;
        sheet.write_string(row, 2, format!("##Budget_{project}##"))?;
    }

    sheet.write_string_with_format(16, 0, "Filled cells", &bold)?;
    sheet.write_formula(16, 1, "=COUNTA(A1:H15)")?;

    Ok(workbook)
}

/// Write the demo template to `path`, creating parent directories as needed.
pub fn write_demo_template(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    demo_workbook()
        .and_then(|mut workbook| workbook.save(path))
        .with_context(|| format!("write template {}", path.display()))?;
    log::info!("generated template {}", path.display());
    Ok(())
}
