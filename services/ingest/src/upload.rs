//! Pre-upload checks
//!
//! Files pushed to the remote folder go through the same reader as the
//! pipeline, so a file that passes here will not be rejected as unreadable
//! or headerless on the next run.

use crate::error::ParseError;
use crate::parser::parse_workbook;
use crate::schema::REQUIRED_COLUMNS;
use crate::source::is_spreadsheet_name;
use thiserror::Error;

/// Largest file accepted for upload (50 MB).
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum UploadRejection {
    #[error("{0}: only .xlsx and .xls files can be uploaded")]
    Extension(String),

    #[error("file is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },

    #[error("not a readable spreadsheet: {0}")]
    Unreadable(String),

    #[error("spreadsheet has no data rows")]
    Empty,

    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

/// Check a file before it is uploaded.
///
/// Header matching is looser than the pipeline's: names are compared
/// trimmed and case-insensitively, since the pipeline's normalizer maps
/// such variants onto the canonical names anyway.
pub fn validate_upload(name: &str, bytes: &[u8]) -> Result<(), UploadRejection> {
    if !is_spreadsheet_name(name) {
        return Err(UploadRejection::Extension(name.to_string()));
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(UploadRejection::TooLarge {
            size: bytes.len(),
            limit: MAX_UPLOAD_BYTES,
        });
    }

    let table = parse_workbook(bytes).map_err(|e| match e {
        ParseError::Empty => UploadRejection::Empty,
        ParseError::Unreadable(detail) => UploadRejection::Unreadable(detail),
    })?;

    let present: Vec<String> = table
        .columns
        .iter()
        .map(|c| c.trim().to_lowercase())
        .collect();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|required| !present.contains(&required.to_lowercase()))
        .map(|required| required.to_string())
        .collect();

    if !missing.is_empty() {
        return Err(UploadRejection::MissingColumns(missing));
    }
    Ok(())
}
