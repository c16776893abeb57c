//! Canonical column schema
//!
//! These strings are the contract with the source spreadsheets. They are
//! matched exactly (case-sensitive) once a table has been normalized.

use serde::Serialize;

pub const SUB_DIVISION: &str = "Sub Division";
pub const OFFICER: &str = "Officer";
pub const TOTAL: &str = "Total";
pub const RANK: &str = "Rank";
pub const TEHSIL: &str = "Tehsil/Sub Tehsil";

/// Columns every accepted file must carry after normalization.
pub const REQUIRED_COLUMNS: &[&str] = &[SUB_DIVISION, OFFICER];

/// Placeholder written into identity columns absent from the whole dataset.
pub const UNKNOWN: &str = "Unknown";

/// Provenance column names used when the dataset is exported.
pub const SOURCE_FILE: &str = "Source File";
pub const RECORD_DATE: &str = "Record Date";

/// One of the seven pendency categories tracked per officer and day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum PendencyField {
    UncontestedPendency,
    IncomeCertificate,
    CopyingService,
    InspectionRecords,
    OverdueMortgage,
    OverdueCourtOrders,
    OverdueFardbadars,
}

impl PendencyField {
    pub const ALL: [PendencyField; 7] = [
        PendencyField::UncontestedPendency,
        PendencyField::IncomeCertificate,
        PendencyField::CopyingService,
        PendencyField::InspectionRecords,
        PendencyField::OverdueMortgage,
        PendencyField::OverdueCourtOrders,
        PendencyField::OverdueFardbadars,
    ];

    pub fn column(self) -> &'static str {
        match self {
            PendencyField::UncontestedPendency => "Uncontested Pendency",
            PendencyField::IncomeCertificate => "Income Certificate",
            PendencyField::CopyingService => "Copying Service",
            PendencyField::InspectionRecords => "Inspection Records",
            PendencyField::OverdueMortgage => "Overdue Mortgage",
            PendencyField::OverdueCourtOrders => "Overdue Court Orders",
            PendencyField::OverdueFardbadars => "Overdue Fardbadars",
        }
    }

    /// Position in [`PendencyField::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_column(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.column() == name)
    }
}

/// Every canonical column name, in export order.
pub fn canonical_columns() -> Vec<&'static str> {
    let mut columns = vec![SUB_DIVISION, TEHSIL, OFFICER, RANK];
    columns.extend(PendencyField::ALL.iter().map(|f| f.column()));
    columns.push(TOTAL);
    columns
}

/// Case and whitespace insensitive comparison key for a column header.
///
/// `"  SUB   division "` and `"Sub Division"` share the key `"sub division"`.
pub fn column_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
