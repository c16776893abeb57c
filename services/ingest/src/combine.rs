//! Aggregator
//!
//! Unions every accepted table into one [`Dataset`]. Step order matters
//! because later steps look at which columns the earlier ones produced:
//!
//! 1. Outer union on column names, first appearance fixes column order.
//!    Cells a file does not have are empty.
//! 2. Fold `TOTAL`/`SubDivision` into their canonical names.
//! 3. Coerce pendency columns to non-negative integers, unparsable as 0.
//! 4. `Total`: coerce for rows whose file carried a `Total` column,
//!    otherwise sum the row's pendency counts.
//! 5. Back-fill `Officer`/`Sub Division` with `Unknown` when the column is
//!    missing from the whole union.
//! 6. Coerce `Rank` to a number, unparsable as no rank.
//!
//! A source `Total` is trusted as-is. It is never reconciled against the
//! pendency sum.

use crate::dataset::{CanonicalRecord, Dataset, PendencyCounts};
use crate::error::CombineError;
use crate::normalize::fold_combined_columns;
use crate::schema::{self, canonical_columns, PendencyField};
use crate::table::{Cell, RawTable};
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::{debug, error};

/// A validated table with its provenance.
#[derive(Debug, Clone)]
pub struct TaggedTable {
    pub source_file: String,
    pub record_date: Option<NaiveDate>,
    pub table: RawTable,
}

/// Union of all tables before typing.
struct Union {
    columns: Vec<String>,
    /// For each input table, the union position of each of its columns.
    targets: Vec<Vec<usize>>,
    rows: Vec<(usize, Vec<Cell>)>,
}

impl Union {
    fn table_has(&self, table_idx: usize, col: usize) -> bool {
        self.targets[table_idx].contains(&col)
    }
}

pub fn combine(tables: &[TaggedTable]) -> Result<Dataset, CombineError> {
    let mut union = union_tables(tables)?;
    fold_combined_columns(&mut union.columns);

    let position = |name: &str| union.columns.iter().position(|c| c == name);

    let pendency: Vec<(PendencyField, usize)> = PendencyField::ALL
        .iter()
        .filter_map(|f| position(f.column()).map(|i| (*f, i)))
        .collect();
    let total_col = position(schema::TOTAL);
    let officer_col = position(schema::OFFICER);
    let sub_division_col = position(schema::SUB_DIVISION);
    let tehsil_col = position(schema::TEHSIL);
    let rank_col = position(schema::RANK);

    let canonical = canonical_columns();
    let extra_cols: Vec<usize> = union
        .columns
        .iter()
        .enumerate()
        .filter(|(_, c)| !canonical.contains(&c.as_str()))
        .map(|(i, _)| i)
        .collect();

    if total_col.is_none() {
        debug!(
            pendency_columns = pendency.len(),
            "no Total column, computing from pendency columns"
        );
    }

    let records = union
        .rows
        .iter()
        .map(|(table_idx, cells)| {
            let tagged = &tables[*table_idx];

            let mut counts = PendencyCounts::default();
            for (field, col) in &pendency {
                counts.set(*field, coerce_count(&cells[*col]));
            }
            let total = match total_col {
                Some(col) if union.table_has(*table_idx, col) => coerce_count(&cells[col]),
                _ => counts.sum(),
            };

            CanonicalRecord {
                sub_division: identity(sub_division_col, cells),
                officer: identity(officer_col, cells),
                tehsil: tehsil_col.and_then(|col| cells[col].to_text()),
                rank: rank_col.and_then(|col| cells[col].to_number()),
                pendency: counts,
                total,
                source_file: tagged.source_file.clone(),
                record_date: tagged.record_date,
                extra: extra_cols.iter().map(|col| cells[*col].clone()).collect(),
            }
        })
        .collect();

    Ok(Dataset {
        pendency_columns: pendency.iter().map(|(f, _)| *f).collect(),
        has_tehsil: tehsil_col.is_some(),
        has_rank: rank_col.is_some(),
        extra_columns: extra_cols.iter().map(|i| union.columns[*i].clone()).collect(),
        records,
    })
}

fn union_tables(tables: &[TaggedTable]) -> Result<Union, CombineError> {
    let mut columns: Vec<String> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for tagged in tables {
        if let Some(column) = tagged.table.duplicate_columns().into_iter().next() {
            error!(file = %tagged.source_file, column = %column, "cannot union table with duplicate column");
            return Err(CombineError::AmbiguousColumn {
                file: tagged.source_file.clone(),
                column,
            });
        }
        for column in &tagged.table.columns {
            if !index.contains_key(column) {
                index.insert(column.clone(), columns.len());
                columns.push(column.clone());
            }
        }
    }

    let width = columns.len();
    let mut targets = Vec::with_capacity(tables.len());
    let mut rows = Vec::new();
    for (table_idx, tagged) in tables.iter().enumerate() {
        let positions: Vec<usize> = tagged.table.columns.iter().map(|c| index[c]).collect();
        for row in &tagged.table.rows {
            let mut cells = vec![Cell::Empty; width];
            for (cell, &target) in row.iter().zip(&positions) {
                cells[target] = cell.clone();
            }
            rows.push((table_idx, cells));
        }
        targets.push(positions);
    }

    Ok(Union { columns, targets, rows })
}

/// Count coercion: missing or unparsable is 0, fractions truncate,
/// negatives clamp to 0.
pub fn coerce_count(cell: &Cell) -> i64 {
    cell.to_number()
        .map(|n| (n.trunc() as i64).max(0))
        .unwrap_or(0)
}

/// `Unknown` only when the column is absent from the whole union; a blank
/// cell in a present column stays blank.
fn identity(col: Option<usize>, cells: &[Cell]) -> String {
    match col {
        Some(col) => cells[col].to_text().unwrap_or_default(),
        None => schema::UNKNOWN.to_string(),
    }
}
