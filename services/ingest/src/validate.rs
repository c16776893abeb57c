//! Record validator
//!
//! File-grained: a table is either admitted whole or contributes nothing.

use crate::error::Rejection;
use crate::schema::REQUIRED_COLUMNS;
use crate::table::RawTable;

/// Check a normalized table before it joins the dataset.
///
/// Missing columns are reported in canonical order, and only the ones
/// actually missing are listed.
pub fn validate(table: &RawTable) -> Result<(), Rejection> {
    if table.is_empty() {
        return Err(Rejection::Empty);
    }

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|column| !table.has_column(column))
        .map(|column| column.to_string())
        .collect();

    if !missing.is_empty() {
        return Err(Rejection::MissingColumns(missing));
    }

    // Cells under a repeated name cannot be placed in the combined table
    let duplicates = table.duplicate_columns();
    if !duplicates.is_empty() {
        return Err(Rejection::Other(format!(
            "repeated column names: {}",
            duplicates.join(", ")
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Cell;

    fn table(columns: &[&str], rows: usize) -> RawTable {
        RawTable::new(
            columns.iter().map(|c| c.to_string()).collect(),
            (0..rows).map(|_| vec![Cell::Text("x".into()); columns.len()]).collect(),
        )
    }

    #[test]
    fn test_valid_table() {
        assert_eq!(validate(&table(&["Sub Division", "Officer", "Total"], 2)), Ok(()));
    }

    #[test]
    fn test_empty_table_rejected() {
        assert_eq!(validate(&table(&["Sub Division", "Officer"], 0)), Err(Rejection::Empty));
    }

    #[test]
    fn test_missing_both_columns_listed() {
        assert_eq!(
            validate(&table(&["Total"], 1)),
            Err(Rejection::MissingColumns(vec![
                "Sub Division".into(),
                "Officer".into()
            ]))
        );
    }

    #[test]
    fn test_missing_one_column_listed_alone() {
        assert_eq!(
            validate(&table(&["Officer", "Total"], 1)),
            Err(Rejection::MissingColumns(vec!["Sub Division".into()]))
        );
    }

    #[test]
    fn test_repeated_column_rejects_only_this_table() {
        assert_eq!(
            validate(&table(&["Sub Division", "Officer", "Remarks", "Remarks"], 1)),
            Err(Rejection::Other("repeated column names: Remarks".into()))
        );
    }

    #[test]
    fn test_match_is_exact_after_normalization() {
        // Un-normalized spellings are not accepted here
        assert_eq!(
            validate(&table(&["sub division", "Officer"], 1)),
            Err(Rejection::MissingColumns(vec!["Sub Division".into()]))
        );
    }
}
