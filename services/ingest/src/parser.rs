//! Spreadsheet parser
//!
//! Turns raw workbook bytes into a [`RawTable`]. The first row of the sheet
//! is the header; completely blank rows are dropped.
//!
//! Sheet selection happens in two attempts. The first reads the first
//! visible worksheet according to the workbook metadata. Exported files
//! sometimes carry metadata that disagrees with the physical sheet order,
//! so if that fails the sheet at index 0 is read directly.

use crate::error::ParseError;
use crate::table::{Cell, RawTable};
use calamine::{open_workbook_auto_from_rs, Data, Range, Reader, SheetType, SheetVisible, Sheets};
use std::collections::HashSet;
use std::io::Cursor;
use tracing::{debug, warn};

type Workbook = Sheets<Cursor<Vec<u8>>>;

/// Parse the first readable sheet of a workbook.
///
/// Fails with [`ParseError::Empty`] when the sheet has a header but no data
/// rows (or nothing at all), and [`ParseError::Unreadable`] when neither
/// sheet-selection attempt produces a range.
pub fn parse_workbook(bytes: &[u8]) -> Result<RawTable, ParseError> {
    let mut workbook: Workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| ParseError::Unreadable(e.to_string()))?;

    let range = match read_default_sheet(&mut workbook) {
        Ok(range) => range,
        Err(first) => {
            warn!(error = %first, "default sheet unreadable, retrying sheet index 0");
            read_sheet_at_zero(&mut workbook).map_err(|second| {
                ParseError::Unreadable(format!("{}; sheet 0: {}", first, second))
            })?
        }
    };

    let table = table_from_range(&range);
    if table.is_empty() {
        return Err(ParseError::Empty);
    }
    Ok(table)
}

fn read_default_sheet(workbook: &mut Workbook) -> Result<Range<Data>, String> {
    let name = workbook
        .sheets_metadata()
        .iter()
        .find(|s| s.typ == SheetType::WorkSheet && s.visible == SheetVisible::Visible)
        .map(|s| s.name.clone())
        .ok_or_else(|| "workbook has no visible worksheet".to_string())?;

    debug!(sheet = %name, "reading default sheet");
    workbook.worksheet_range(&name).map_err(|e| e.to_string())
}

fn read_sheet_at_zero(workbook: &mut Workbook) -> Result<Range<Data>, String> {
    match workbook.worksheet_range_at(0) {
        Some(result) => result.map_err(|e| e.to_string()),
        None => Err("workbook has no sheets".to_string()),
    }
}

/// Header row plus non-blank data rows of a sheet range.
pub fn table_from_range(range: &Range<Data>) -> RawTable {
    let mut rows = range.rows();
    let columns: Vec<String> = match rows.next() {
        Some(header) => dedupe_headers(
            header
                .iter()
                .enumerate()
                .map(|(i, cell)| header_name(i, cell))
                .collect(),
        ),
        None => return RawTable::default(),
    };

    let data = rows
        .map(|row| row.iter().map(cell_from_data).collect::<Vec<_>>())
        .filter(|row| !row.iter().all(Cell::is_empty))
        .collect();

    RawTable::new(columns, data)
}

/// Blank headers get a positional placeholder so every column is addressable.
fn header_name(index: usize, cell: &Data) -> String {
    match cell_from_data(cell) {
        c if c.is_empty() => format!("Unnamed: {}", index),
        c => c.to_string(),
    }
}

/// Repeated headers get a numeric suffix: `Remarks`, `Remarks.1`,
/// `Remarks.2`. A suffixed name that is already taken is skipped.
fn dedupe_headers(columns: Vec<String>) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::with_capacity(columns.len());
    let mut out = Vec::with_capacity(columns.len());
    for column in columns {
        let mut name = column.clone();
        let mut n = 0;
        while used.contains(&name) {
            n += 1;
            name = format!("{}.{}", column, n);
        }
        if n > 0 {
            debug!(column = %column, renamed = %name, "renamed repeated header");
        }
        used.insert(name.clone());
        out.push(name);
    }
    out
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(e) => Cell::Text(e.to_string()),
    }
}
