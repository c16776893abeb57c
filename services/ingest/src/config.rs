//! Configuration
//!
//! Values come from the environment (a `.env` file is honoured by the
//! binaries through `dotenvy`) and are passed explicitly into the pipeline.
//! Nothing here is global.

use crate::error::SourceError;
use crate::source::{DriveConfig, DriveFolder, FileOrder, LocalFolder};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Which origin a run reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Local,
    Remote,
    /// Remote first, local folder when the remote yields nothing
    Hybrid,
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(SourceKind::Local),
            "remote" | "drive" => Ok(SourceKind::Remote),
            "hybrid" => Ok(SourceKind::Hybrid),
            other => Err(format!("unknown source kind '{}'", other)),
        }
    }
}

/// Per-run pipeline settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Overrides the origin's own processing order when set.
    pub order: Option<FileOrder>,
    /// In a hybrid run, read the fallback origin when the primary accepts
    /// no files.
    pub fallback_on_empty: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            order: None,
            fallback_on_empty: true,
        }
    }
}

/// Where files come from.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub data_dir: PathBuf,
    pub drive_folder_id: Option<String>,
    pub drive_access_token: Option<String>,
    pub drive_api_base: Option<String>,
    pub drive_timeout: Duration,
}

impl SourceConfig {
    pub fn from_env() -> Result<Self, SourceError> {
        let kind = std::env::var("SOURCE_KIND")
            .unwrap_or_else(|_| "local".to_string())
            .parse()
            .map_err(SourceError::Config)?;

        Ok(Self {
            kind,
            data_dir: PathBuf::from(
                std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string()),
            ),
            drive_folder_id: non_empty_var("DRIVE_FOLDER_ID"),
            drive_access_token: non_empty_var("DRIVE_ACCESS_TOKEN"),
            drive_api_base: non_empty_var("DRIVE_API_BASE"),
            drive_timeout: Duration::from_secs(
                std::env::var("DRIVE_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()
                    .unwrap_or(60),
            ),
        })
    }

    pub fn local(&self) -> LocalFolder {
        LocalFolder::new(&self.data_dir)
    }

    pub fn drive(&self) -> Result<DriveConfig, SourceError> {
        let folder_id = self
            .drive_folder_id
            .clone()
            .ok_or_else(|| SourceError::Config("DRIVE_FOLDER_ID not set".into()))?;
        let access_token = self
            .drive_access_token
            .clone()
            .ok_or_else(|| SourceError::Config("DRIVE_ACCESS_TOKEN not set".into()))?;

        let mut config = DriveConfig::new(folder_id, access_token);
        if let Some(base) = &self.drive_api_base {
            config.api_base = base.clone();
        }
        config.timeout = self.drive_timeout;
        Ok(config)
    }

    pub fn remote(&self) -> Result<DriveFolder, SourceError> {
        DriveFolder::new(self.drive()?)
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
