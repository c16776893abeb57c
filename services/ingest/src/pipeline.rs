//! Pipeline orchestrator
//!
//! Responsibilities:
//! - List the origin and process each file in order
//! - Read, parse, normalize, validate and date each file
//! - Record every file's outcome, never letting one file abort the run
//! - Combine accepted tables into the dataset
//!
//! A run is stateless and deterministic: the same files in the same order
//! produce the same dataset.

use crate::combine::{combine, TaggedTable};
use crate::config::PipelineConfig;
use crate::dataset::Dataset;
use crate::date::extract_date;
use crate::error::{CombineError, Rejection};
use crate::normalize::normalize;
use crate::parser::parse_workbook;
use crate::source::{FileHandle, FileSource, SourceFingerprint};
use crate::validate::validate;
use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{error, info, warn};

/// Result of processing one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FileOutcome {
    Accepted { file: String, records: usize },
    Rejected { file: String, reason: Rejection },
}

impl FileOutcome {
    pub fn file(&self) -> &str {
        match self {
            FileOutcome::Accepted { file, .. } | FileOutcome::Rejected { file, .. } => file,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, FileOutcome::Accepted { .. })
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    /// At least one row made it into the dataset
    Completed,
    /// Nothing to show; not a fault
    NoData,
    /// Accepted tables could not be combined
    Fatal,
}

/// Counts for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub status: RunStatus,
    pub files_listed: usize,
    pub files_accepted: usize,
    pub files_rejected: usize,
    pub records: usize,
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub source: String,
    pub fingerprint: SourceFingerprint,
    pub dataset: Dataset,
    pub outcomes: Vec<FileOutcome>,
    /// Set when the origin could not be listed; the run then saw no files.
    pub listing_error: Option<String>,
    pub fatal: Option<CombineError>,
    /// Origin whose run came up empty before this one was read.
    pub fell_back_from: Option<String>,
}

impl RunReport {
    pub fn status(&self) -> RunStatus {
        if self.fatal.is_some() {
            RunStatus::Fatal
        } else if self.dataset.is_empty() {
            RunStatus::NoData
        } else {
            RunStatus::Completed
        }
    }

    pub fn accepted(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(|o| o.is_accepted())
    }

    pub fn rejected(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(|o| !o.is_accepted())
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            status: self.status(),
            files_listed: self.outcomes.len(),
            files_accepted: self.accepted().count(),
            files_rejected: self.rejected().count(),
            records: self.dataset.len(),
        }
    }
}

/// Runs the ingestion pipeline with an explicit configuration.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Files the run would process, in processing order.
    pub fn list(&self, source: &dyn FileSource) -> Result<Vec<FileHandle>, crate::error::SourceError> {
        let mut files = source.list_files()?;
        if let Some(order) = self.config.order {
            order.sort(&mut files);
        }
        Ok(files)
    }

    pub fn run(&self, source: &dyn FileSource) -> RunReport {
        let label = source.describe();
        info!(source = %label, "starting ingestion run");

        let (files, listing_error) = match self.list(source) {
            Ok(files) => (files, None),
            Err(e) => {
                error!(source = %label, error = %e, "could not list files");
                (Vec::new(), Some(e.to_string()))
            }
        };

        let mut outcomes = Vec::with_capacity(files.len());
        let mut accepted = Vec::new();

        for handle in &files {
            match self.process_file(source, handle) {
                Ok(tagged) => {
                    let records = tagged.table.row_count();
                    info!(file = %handle.name, records, "accepted file");
                    outcomes.push(FileOutcome::Accepted {
                        file: handle.name.clone(),
                        records,
                    });
                    accepted.push(tagged);
                }
                Err(reason) => {
                    warn!(file = %handle.name, reason = %reason, "rejected file");
                    outcomes.push(FileOutcome::Rejected {
                        file: handle.name.clone(),
                        reason,
                    });
                }
            }
        }

        let (dataset, fatal) = match combine(&accepted) {
            Ok(dataset) => (dataset, None),
            Err(e) => {
                error!(error = %e, "combining accepted files failed");
                (Dataset::default(), Some(e))
            }
        };

        let report = RunReport {
            source: label,
            fingerprint: SourceFingerprint::compute(&files),
            dataset,
            outcomes,
            listing_error,
            fatal,
            fell_back_from: None,
        };

        let summary = report.summary();
        info!(
            source = %report.source,
            accepted = summary.files_accepted,
            rejected = summary.files_rejected,
            records = summary.records,
            "ingestion run finished"
        );
        report
    }

    /// Run `primary`; when it accepts no files and the configuration allows,
    /// run `fallback` instead. The primary's rejections are kept in front of
    /// the fallback's outcomes.
    pub fn run_with_fallback(&self, primary: &dyn FileSource, fallback: &dyn FileSource) -> RunReport {
        let first = self.run(primary);
        let came_up_empty = first.fatal.is_none() && first.accepted().next().is_none();
        if !(self.config.fallback_on_empty && came_up_empty) {
            return first;
        }

        info!(primary = %first.source, fallback = %fallback.describe(), "primary source yielded no data, falling back");
        let mut second = self.run(fallback);
        let mut outcomes = first.outcomes;
        outcomes.append(&mut second.outcomes);
        second.outcomes = outcomes;
        second.fell_back_from = Some(first.source);
        second
    }

    /// read → parse → normalize → validate → date. Panics inside the
    /// spreadsheet reader are contained to this file.
    fn process_file(&self, source: &dyn FileSource, handle: &FileHandle) -> Result<TaggedTable, Rejection> {
        let bytes = source.read(handle)?;
        if bytes.is_empty() {
            return Err(Rejection::Empty);
        }

        let table = catch_unwind(AssertUnwindSafe(|| parse_workbook(&bytes)))
            .map_err(|_| Rejection::Other("spreadsheet reader panicked".into()))??;

        let table = normalize(table);
        validate(&table)?;

        Ok(TaggedTable {
            source_file: handle.name.clone(),
            record_date: extract_date(&handle.name),
            table,
        })
    }
}
