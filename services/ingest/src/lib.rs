//! Pendency report ingestion
//!
//! Reads spreadsheet reports from a local folder or a remote folder, maps
//! their headers onto a fixed schema, rejects files that cannot be used and
//! unions the rest into one typed [`Dataset`].
//!
//! ```text
//! FileSource -> parse_workbook -> normalize -> validate -> combine -> Dataset
//! ```
//!
//! Every stage below the origin is a pure function of the file bytes, so a
//! run over the same files in the same order always yields the same dataset.

pub mod combine;
pub mod config;
pub mod dataset;
pub mod date;
pub mod error;
pub mod normalize;
pub mod parser;
pub mod pipeline;
pub mod schema;
pub mod source;
pub mod table;
pub mod upload;
pub mod validate;

#[cfg(test)]
mod fixtures;

pub use config::{PipelineConfig, SourceConfig, SourceKind};
pub use dataset::{CanonicalRecord, Dataset};
pub use error::{CombineError, ParseError, Rejection, SourceError};
pub use pipeline::{FileOutcome, Pipeline, RunReport, RunStatus, RunSummary};
pub use source::{FileHandle, FileOrder, FileSource, SourceFingerprint};
