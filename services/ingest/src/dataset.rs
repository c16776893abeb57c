//! The combined, typed dataset

use crate::schema::{self, PendencyField};
use crate::table::Cell;
use chrono::NaiveDate;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::io::Write;

/// Pendency counts of one record, indexed by [`PendencyField::index`].
///
/// A field is `None` only when its column is absent from the whole dataset;
/// present columns always hold a coerced count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendencyCounts([Option<i64>; 7]);

impl PendencyCounts {
    pub fn get(&self, field: PendencyField) -> Option<i64> {
        self.0[field.index()]
    }

    pub fn set(&mut self, field: PendencyField, value: i64) {
        self.0[field.index()] = Some(value);
    }

    /// Sum over the fields that are present, saturating at `i64::MAX`.
    pub fn sum(&self) -> i64 {
        self.0.iter().flatten().fold(0i64, |acc, v| acc.saturating_add(*v))
    }
}

impl Serialize for PendencyCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let present: Vec<_> = PendencyField::ALL
            .iter()
            .filter_map(|f| self.get(*f).map(|v| (f.column(), v)))
            .collect();
        let mut map = serializer.serialize_map(Some(present.len()))?;
        for (column, value) in present {
            map.serialize_entry(column, &value)?;
        }
        map.end()
    }
}

/// One row of the dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalRecord {
    pub sub_division: String,
    pub officer: String,
    pub tehsil: Option<String>,
    pub rank: Option<f64>,
    pub pendency: PendencyCounts,
    pub total: i64,
    pub source_file: String,
    pub record_date: Option<NaiveDate>,
    /// Cells of [`Dataset::extra_columns`], positionally.
    pub extra: Vec<Cell>,
}

/// All accepted rows, in file processing order. Rebuilt from scratch on
/// every run and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dataset {
    /// Pendency columns present in at least one accepted file.
    pub pendency_columns: Vec<PendencyField>,
    pub has_tehsil: bool,
    pub has_rank: bool,
    /// Non-canonical columns carried through unchanged.
    pub extra_columns: Vec<String>,
    pub records: Vec<CanonicalRecord>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records_from<'a>(&'a self, source_file: &'a str) -> impl Iterator<Item = &'a CanonicalRecord> {
        self.records.iter().filter(move |r| r.source_file == source_file)
    }

    /// Header row used by [`Dataset::write_csv`].
    pub fn csv_header(&self) -> Vec<String> {
        let mut header = vec![schema::SUB_DIVISION.to_string()];
        if self.has_tehsil {
            header.push(schema::TEHSIL.to_string());
        }
        header.push(schema::OFFICER.to_string());
        if self.has_rank {
            header.push(schema::RANK.to_string());
        }
        header.extend(self.pendency_columns.iter().map(|f| f.column().to_string()));
        header.push(schema::TOTAL.to_string());
        header.push(schema::SOURCE_FILE.to_string());
        header.push(schema::RECORD_DATE.to_string());
        header.extend(self.extra_columns.iter().cloned());
        header
    }

    /// Write the dataset as CSV: identity columns, pendency counts, total,
    /// provenance, then passthrough columns.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut out = csv::Writer::from_writer(writer);
        out.write_record(self.csv_header())?;

        for record in &self.records {
            let mut row = vec![record.sub_division.clone()];
            if self.has_tehsil {
                row.push(record.tehsil.clone().unwrap_or_default());
            }
            row.push(record.officer.clone());
            if self.has_rank {
                row.push(record.rank.map(|r| Cell::Number(r).to_string()).unwrap_or_default());
            }
            row.extend(
                self.pendency_columns
                    .iter()
                    .map(|f| record.pendency.get(*f).unwrap_or(0).to_string()),
            );
            row.push(record.total.to_string());
            row.push(record.source_file.clone());
            row.push(
                record
                    .record_date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
            );
            row.extend(record.extra.iter().map(|c| c.to_string()));
            out.write_record(&row)?;
        }

        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(officer: &str, total: i64) -> CanonicalRecord {
        let mut pendency = PendencyCounts::default();
        pendency.set(PendencyField::IncomeCertificate, total);
        CanonicalRecord {
            sub_division: "Amritsar-I".into(),
            officer: officer.into(),
            tehsil: None,
            rank: Some(1.0),
            pendency,
            total,
            source_file: "fcr_20240115.xlsx".into(),
            record_date: NaiveDate::from_ymd_opt(2024, 1, 15),
            extra: vec![Cell::Text("note".into())],
        }
    }

    #[test]
    fn test_pendency_counts_sum_present_only() {
        let mut counts = PendencyCounts::default();
        counts.set(PendencyField::CopyingService, 3);
        counts.set(PendencyField::OverdueMortgage, 4);
        assert_eq!(counts.sum(), 7);
        assert_eq!(counts.get(PendencyField::UncontestedPendency), None);
    }

    #[test]
    fn test_pendency_counts_sum_saturates() {
        let mut counts = PendencyCounts::default();
        counts.set(PendencyField::IncomeCertificate, i64::MAX);
        counts.set(PendencyField::CopyingService, i64::MAX);
        counts.set(PendencyField::OverdueMortgage, 1);
        assert_eq!(counts.sum(), i64::MAX);
    }

    #[test]
    fn test_pendency_counts_serialize_as_map() {
        let mut counts = PendencyCounts::default();
        counts.set(PendencyField::OverdueFardbadars, 2);
        assert_eq!(
            serde_json::to_value(counts).unwrap(),
            serde_json::json!({"Overdue Fardbadars": 2})
        );
    }

    #[test]
    fn test_write_csv() {
        let dataset = Dataset {
            pendency_columns: vec![PendencyField::IncomeCertificate],
            has_tehsil: false,
            has_rank: true,
            extra_columns: vec!["Remarks".into()],
            records: vec![record("SDM", 5)],
        };

        let mut out = Vec::new();
        dataset.write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(
            text,
            "Sub Division,Officer,Rank,Income Certificate,Total,Source File,Record Date,Remarks\n\
             Amritsar-I,SDM,1,5,5,fcr_20240115.xlsx,2024-01-15,note\n"
        );
    }

    #[test]
    fn test_records_from_source() {
        let mut other = record("Tehsildar", 1);
        other.source_file = "other.xlsx".into();
        let dataset = Dataset {
            records: vec![record("SDM", 5), other],
            ..Dataset::default()
        };
        assert_eq!(dataset.records_from("other.xlsx").count(), 1);
        assert_eq!(dataset.len(), 2);
    }
}
