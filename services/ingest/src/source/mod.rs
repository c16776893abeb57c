//! File origins
//!
//! A [`FileSource`] lists spreadsheet files and hands back their raw bytes.
//! Two origins implement it:
//! - [`LocalFolder`] reads a directory on disk
//! - [`DriveFolder`] reads one folder of a remote file store
//!
//! Both apply the same name filter: lock artifacts (`~$...`) and anything
//! that is not `.xlsx`/`.xls` never reach the pipeline.

mod drive;
mod local;

pub use drive::{DriveConfig, DriveFolder};
pub use local::LocalFolder;

use crate::error::SourceError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::str::FromStr;

/// Prefix spreadsheet editors give the lock file of an open workbook.
pub const LOCK_FILE_PREFIX: &str = "~$";

/// Accepted file extensions, compared case-insensitively.
pub const SPREADSHEET_EXTENSIONS: &[&str] = &[".xlsx", ".xls"];

/// Where a listed file lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Locator {
    Path(PathBuf),
    Remote(String),
}

/// A listed file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileHandle {
    pub name: String,
    pub locator: Locator,
    pub modified_time: Option<DateTime<Utc>>,
    pub size: Option<u64>,
}

/// Order in which listed files are processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileOrder {
    /// Ascending by file name
    Name,
    /// Newest modification first; files without a timestamp go last
    ModifiedDesc,
}

impl FileOrder {
    pub fn sort(self, files: &mut [FileHandle]) {
        match self {
            FileOrder::Name => files.sort_by(|a, b| a.name.cmp(&b.name)),
            FileOrder::ModifiedDesc => files.sort_by(|a, b| {
                b.modified_time
                    .cmp(&a.modified_time)
                    .then_with(|| a.name.cmp(&b.name))
            }),
        }
    }
}

impl FromStr for FileOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "name" => Ok(FileOrder::Name),
            "modified-desc" | "modified" => Ok(FileOrder::ModifiedDesc),
            other => Err(format!("unknown file order '{}'", other)),
        }
    }
}

/// Common contract of every file origin.
pub trait FileSource {
    /// Short human-readable label used in logs.
    fn describe(&self) -> String;

    /// Default processing order for this origin.
    fn order(&self) -> FileOrder;

    /// Spreadsheet files currently present, filtered and in [`Self::order`].
    fn list_files(&self) -> Result<Vec<FileHandle>, SourceError>;

    /// Raw bytes of a listed file.
    fn read(&self, handle: &FileHandle) -> Result<Vec<u8>, SourceError>;
}

impl<S: FileSource + ?Sized> FileSource for Box<S> {
    fn describe(&self) -> String {
        (**self).describe()
    }

    fn order(&self) -> FileOrder {
        (**self).order()
    }

    fn list_files(&self) -> Result<Vec<FileHandle>, SourceError> {
        (**self).list_files()
    }

    fn read(&self, handle: &FileHandle) -> Result<Vec<u8>, SourceError> {
        (**self).read(handle)
    }
}

/// True for names the pipeline should ingest.
pub fn is_spreadsheet_name(name: &str) -> bool {
    if name.starts_with(LOCK_FILE_PREFIX) {
        return false;
    }
    let lower = name.to_lowercase();
    SPREADSHEET_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

// =============================================================================
// CHANGE DETECTION
// =============================================================================

/// Digest of a listing, used by callers to decide whether a cached dataset
/// is stale. Only metadata is hashed, never file contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFingerprint(String);

impl SourceFingerprint {
    pub fn compute(files: &[FileHandle]) -> Self {
        let mut entries: Vec<&FileHandle> = files.iter().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        let mut hasher = Sha256::new();
        for file in &entries {
            hasher.update(file.name.as_bytes());
            hasher.update([0]);
            if let Some(modified) = file.modified_time {
                hasher.update(modified.timestamp_millis().to_le_bytes());
            }
            hasher.update([0]);
            if let Some(size) = file.size {
                hasher.update(size.to_le_bytes());
            }
            hasher.update([0xff]);
        }
        hasher.update((entries.len() as u64).to_le_bytes());

        Self(format!("sha256:{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SourceFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn handle(name: &str, modified: Option<i64>, size: Option<u64>) -> FileHandle {
        FileHandle {
            name: name.to_string(),
            locator: Locator::Remote(name.to_string()),
            modified_time: modified.and_then(|s| Utc.timestamp_opt(s, 0).single()),
            size,
        }
    }

    // -------------------------------------------------------------------------
    // NAME FILTER TESTS
    // -------------------------------------------------------------------------

    #[test]
    fn test_spreadsheet_extensions_accepted() {
        assert!(is_spreadsheet_name("report_20240115.xlsx"));
        assert!(is_spreadsheet_name("legacy.xls"));
        assert!(is_spreadsheet_name("SHOUTING.XLSX"));
    }

    #[test]
    fn test_lock_files_excluded() {
        assert!(!is_spreadsheet_name("~$report_20240115.xlsx"));
        assert!(!is_spreadsheet_name("~$legacy.xls"));
    }

    #[test]
    fn test_other_extensions_excluded() {
        assert!(!is_spreadsheet_name("notes.csv"));
        assert!(!is_spreadsheet_name("report.xlsx.bak"));
        assert!(!is_spreadsheet_name("xlsx"));
    }

    // -------------------------------------------------------------------------
    // ORDERING TESTS
    // -------------------------------------------------------------------------

    #[test]
    fn test_order_by_name() {
        let mut files = vec![handle("c.xlsx", None, None), handle("a.xlsx", None, None), handle("b.xlsx", None, None)];
        FileOrder::Name.sort(&mut files);
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.xlsx", "b.xlsx", "c.xlsx"]);
    }

    #[test]
    fn test_order_by_modified_desc_puts_untimed_last() {
        let mut files = vec![
            handle("old.xlsx", Some(100), None),
            handle("none.xlsx", None, None),
            handle("new.xlsx", Some(200), None),
        ];
        FileOrder::ModifiedDesc.sort(&mut files);
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["new.xlsx", "old.xlsx", "none.xlsx"]);
    }

    #[test]
    fn test_file_order_from_str() {
        assert_eq!("name".parse::<FileOrder>(), Ok(FileOrder::Name));
        assert_eq!("Modified-Desc".parse::<FileOrder>(), Ok(FileOrder::ModifiedDesc));
        assert!("random".parse::<FileOrder>().is_err());
    }

    // -------------------------------------------------------------------------
    // FINGERPRINT TESTS
    // -------------------------------------------------------------------------

    #[test]
    fn test_fingerprint_ignores_listing_order() {
        let a = vec![handle("a.xlsx", Some(1), Some(10)), handle("b.xlsx", Some(2), Some(20))];
        let b = vec![handle("b.xlsx", Some(2), Some(20)), handle("a.xlsx", Some(1), Some(10))];
        assert_eq!(SourceFingerprint::compute(&a), SourceFingerprint::compute(&b));
    }

    #[test]
    fn test_fingerprint_changes_with_metadata() {
        let before = vec![handle("a.xlsx", Some(1), Some(10))];
        let touched = vec![handle("a.xlsx", Some(2), Some(10))];
        let grown = vec![handle("a.xlsx", Some(1), Some(11))];
        let added = vec![handle("a.xlsx", Some(1), Some(10)), handle("b.xlsx", None, None)];

        let base = SourceFingerprint::compute(&before);
        assert_ne!(base, SourceFingerprint::compute(&touched));
        assert_ne!(base, SourceFingerprint::compute(&grown));
        assert_ne!(base, SourceFingerprint::compute(&added));
    }

    #[test]
    fn test_fingerprint_format() {
        let fp = SourceFingerprint::compute(&[]);
        assert!(fp.as_str().starts_with("sha256:"));
        assert_eq!(fp.as_str().len(), "sha256:".len() + 64);
    }
}
