//! In-memory XLSX workbooks for tests
//!
//! Writes the smallest container calamine accepts: workbook, relationships
//! and one worksheet per sheet, with strings stored inline.

use crate::table::Cell;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub struct SheetSpec {
    name: String,
    hidden: bool,
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl SheetSpec {
    pub fn visible(name: &str, headers: &[&str], rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.to_string(),
            hidden: false,
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows,
        }
    }

    pub fn hidden(name: &str, headers: &[&str], rows: Vec<Vec<Cell>>) -> Self {
        Self {
            hidden: true,
            ..Self::visible(name, headers, rows)
        }
    }
}

/// Single visible sheet named `Sheet1`.
pub fn xlsx(headers: &[&str], rows: Vec<Vec<Cell>>) -> Vec<u8> {
    workbook(&[SheetSpec::visible("Sheet1", headers, rows)])
}

pub fn workbook(sheets: &[SheetSpec]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    let mut put = |path: &str, content: String| {
        zip.start_file(path, options.clone()).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    };

    let overrides: String = (1..=sheets.len())
        .map(|i| format!(
            r#"<Override PartName="/xl/worksheets/sheet{i}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
        ))
        .collect();
    put(
        "[Content_Types].xml",
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>{overrides}</Types>"#
        ),
    );
    put(
        "_rels/.rels",
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#.to_string(),
    );

    let sheet_entries: String = sheets
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let state = if s.hidden { r#" state="hidden""# } else { "" };
            format!(
                r#"<sheet name="{}" sheetId="{}"{} r:id="rId{}"/>"#,
                escape(&s.name),
                i + 1,
                state,
                i + 1
            )
        })
        .collect();
    put(
        "xl/workbook.xml",
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>{sheet_entries}</sheets></workbook>"#
        ),
    );

    let relationships: String = (1..=sheets.len())
        .map(|i| format!(
            r#"<Relationship Id="rId{i}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{i}.xml"/>"#
        ))
        .collect();
    put(
        "xl/_rels/workbook.xml.rels",
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{relationships}</Relationships>"#
        ),
    );

    for (i, sheet) in sheets.iter().enumerate() {
        put(&format!("xl/worksheets/sheet{}.xml", i + 1), sheet_xml(sheet));
    }

    zip.finish().unwrap().into_inner()
}

fn sheet_xml(sheet: &SheetSpec) -> String {
    let mut rows = Vec::new();
    if !sheet.headers.is_empty() {
        let header: Vec<Cell> = sheet.headers.iter().map(|h| Cell::Text(h.clone())).collect();
        rows.push(header);
    }
    rows.extend(sheet.rows.iter().cloned());

    let body: String = rows
        .iter()
        .enumerate()
        .map(|(r, cells)| {
            let cells: String = cells
                .iter()
                .enumerate()
                .filter_map(|(c, cell)| cell_xml(&format!("{}{}", column_letters(c), r + 1), cell))
                .collect();
            format!(r#"<row r="{}">{}</row>"#, r + 1, cells)
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{body}</sheetData></worksheet>"#
    )
}

fn cell_xml(reference: &str, cell: &Cell) -> Option<String> {
    match cell {
        Cell::Empty => None,
        Cell::Text(s) => Some(format!(
            r#"<c r="{}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
            reference,
            escape(s)
        )),
        Cell::Number(n) => Some(format!(r#"<c r="{}"><v>{}</v></c>"#, reference, n)),
        Cell::Bool(b) => Some(format!(r#"<c r="{}" t="b"><v>{}</v></c>"#, reference, u8::from(*b))),
    }
}

fn column_letters(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push((b'A' + (index % 26) as u8) as char);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.iter().rev().collect()
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[test]
fn test_column_letters() {
    assert_eq!(column_letters(0), "A");
    assert_eq!(column_letters(25), "Z");
    assert_eq!(column_letters(26), "AA");
    assert_eq!(column_letters(27), "AB");
}
