use super::{is_spreadsheet_name, FileHandle, FileOrder, FileSource, Locator};
use crate::error::SourceError;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Spreadsheets in one directory on disk (not recursive).
#[derive(Debug, Clone)]
pub struct LocalFolder {
    root: PathBuf,
    order: FileOrder,
}

impl LocalFolder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            order: FileOrder::Name,
        }
    }

    pub fn with_order(mut self, order: FileOrder) -> Self {
        self.order = order;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FileSource for LocalFolder {
    fn describe(&self) -> String {
        format!("local:{}", self.root.display())
    }

    fn order(&self) -> FileOrder {
        self.order
    }

    /// A missing directory lists as empty rather than failing.
    fn list_files(&self) -> Result<Vec<FileHandle>, SourceError> {
        if !self.root.is_dir() {
            warn!(folder = %self.root.display(), "data folder does not exist");
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if !is_spreadsheet_name(&name) {
                debug!(file = %name, "skipping non-spreadsheet entry");
                continue;
            }

            // Entries that vanish or cannot be stat'ed between listing and
            // here still get listed; the read will fail and be recorded.
            let metadata = entry.metadata().ok();
            if metadata.as_ref().is_some_and(|m| !m.is_file()) {
                continue;
            }
            let modified_time = metadata
                .as_ref()
                .and_then(|m| m.modified().ok())
                .map(DateTime::<Utc>::from);

            files.push(FileHandle {
                name,
                locator: Locator::Path(entry.path()),
                modified_time,
                size: metadata.map(|m| m.len()),
            });
        }

        self.order.sort(&mut files);
        Ok(files)
    }

    fn read(&self, handle: &FileHandle) -> Result<Vec<u8>, SourceError> {
        let path = match &handle.locator {
            Locator::Path(path) => path.clone(),
            Locator::Remote(_) => self.root.join(&handle.name),
        };
        Ok(fs::read(path)?)
    }
}
