//! Column normalizer
//!
//! Maps loosely named headers onto the canonical schema. Unrelated columns
//! are left exactly as read. Rules run in order, each only when its
//! canonical column is still missing:
//!
//! 1. Alias: a header equal to a canonical name ignoring case and spacing
//!    (`"SUB  DIVISION"`, `" total "`) takes the canonical name.
//! 2. `Total`: the first header containing `total` is renamed.
//! 3. `Sub Division`: the first header containing both `sub` and
//!    `division` is renamed.
//!
//! When several headers qualify, the first in column order wins. The others
//! are left untouched and logged, since their data will not feed the
//! canonical column.
//!
//! [`fold_combined_columns`] is a separate pass over the union of all files.

use crate::schema::{canonical_columns, column_key, SUB_DIVISION, TOTAL};
use crate::table::RawTable;
use tracing::{debug, warn};

/// A header renamed to its canonical form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
    pub from: String,
    pub to: &'static str,
}

/// What normalization did to one table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub renames: Vec<Rename>,
    /// Headers that matched a rule but lost the tie-break.
    pub discarded: Vec<String>,
}

/// Normalize a table's headers, returning the renamed table.
pub fn normalize(mut table: RawTable) -> RawTable {
    normalize_columns(&mut table);
    table
}

/// Normalize in place and report what changed.
pub fn normalize_columns(table: &mut RawTable) -> NormalizeReport {
    let mut report = NormalizeReport::default();

    for canonical in canonical_columns() {
        let key = column_key(canonical);
        apply_rule(table, canonical, |column| column_key(column) == key, &mut report);
    }

    apply_rule(
        table,
        TOTAL,
        |column| column.to_lowercase().contains("total"),
        &mut report,
    );
    apply_rule(
        table,
        SUB_DIVISION,
        |column| {
            let lower = column.to_lowercase();
            lower.contains("sub") && lower.contains("division")
        },
        &mut report,
    );

    for rename in &report.renames {
        debug!(from = %rename.from, to = rename.to, "renamed column");
    }
    for column in &report.discarded {
        warn!(column = %column, "column matched a canonical rule but an earlier column won");
    }
    report
}

fn apply_rule(
    table: &mut RawTable,
    canonical: &'static str,
    matches: impl Fn(&str) -> bool,
    report: &mut NormalizeReport,
) {
    if table.has_column(canonical) {
        return;
    }

    let candidates: Vec<usize> = table
        .columns
        .iter()
        .enumerate()
        .filter(|(_, column)| !is_canonical(column) && matches(column))
        .map(|(i, _)| i)
        .collect();

    let Some((&winner, rest)) = candidates.split_first() else {
        return;
    };

    report.renames.push(Rename {
        from: table.columns[winner].clone(),
        to: canonical,
    });
    report
        .discarded
        .extend(rest.iter().map(|&i| table.columns[i].clone()));
    table.rename(winner, canonical);
}

fn is_canonical(column: &str) -> bool {
    canonical_columns().contains(&column)
}

/// Final folding over the unioned column list: an all-caps `TOTAL` becomes
/// `Total`, and `SubDivision` becomes `Sub Division`, when the canonical
/// column is still absent.
pub fn fold_combined_columns(columns: &mut [String]) {
    for (variant, canonical) in [("TOTAL", TOTAL), ("SubDivision", SUB_DIVISION)] {
        if columns.iter().any(|c| c == canonical) {
            continue;
        }
        if let Some(column) = columns.iter_mut().find(|c| c.as_str() == variant) {
            debug!(from = variant, to = canonical, "folded combined column");
            *column = canonical.to_string();
        }
    }
}
