//! Pipeline errors

use serde::Serialize;
use thiserror::Error;

/// Errors raised by a [`crate::source::FileSource`] or the remote store.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("remote store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode remote response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised while reading a spreadsheet container.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("unreadable spreadsheet: {0}")]
    Unreadable(String),

    #[error("spreadsheet has no data rows")]
    Empty,
}

/// Why a file contributed no rows to the dataset.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail")]
pub enum Rejection {
    #[error("file is empty")]
    Empty,

    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("{0}")]
    Other(String),
}

impl From<ParseError> for Rejection {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::Empty => Rejection::Empty,
            ParseError::Unreadable(detail) => Rejection::Parse(detail),
        }
    }
}

impl From<SourceError> for Rejection {
    fn from(err: SourceError) -> Self {
        Rejection::Other(err.to_string())
    }
}

/// The one run-fatal condition: accepted tables could not be unioned.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum CombineError {
    #[error("{file}: column {column:?} appears more than once, cannot place its cells")]
    AmbiguousColumn { file: String, column: String },
}
