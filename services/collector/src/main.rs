//! Collector - Manages the remote report folder
//!
//! Responsibilities:
//! - List the spreadsheets currently in the remote folder
//! - Validate reports locally before they are uploaded
//! - Upload reports, optionally replacing a file with the same name
//! - Delete reports by id
//!
//! Usage:
//!   cargo run --bin collector -- list
//!   cargo run --bin collector -- upload reports/fcr_20240115.xlsx --replace
//!   cargo run --bin collector -- delete <FILE_ID>

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ingest::config::SourceConfig;
use ingest::source::{DriveFolder, FileSource, Locator};
use ingest::upload::validate_upload;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "collector", about = "Manages reports in the remote folder")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List spreadsheets in the remote folder, newest first
    List,
    /// Validate and upload one or more reports
    Upload {
        files: Vec<PathBuf>,

        /// Replace an existing remote file with the same name
        #[arg(long, default_value = "false")]
        replace: bool,
    },
    /// Delete a remote file by id
    Delete { id: String },
}

fn list(folder: &DriveFolder) -> Result<()> {
    let files = folder.list_files().context("Failed to list remote folder")?;

    println!("\nRemote files ({}):", folder.describe());
    println!("{:-<60}", "");
    for file in &files {
        let id = match &file.locator {
            Locator::Remote(id) => id.as_str(),
            Locator::Path(_) => "-",
        };
        let modified = file
            .modified_time
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        println!("  {} [{}] modified {}", file.name, id, modified);
    }
    println!("{:-<60}", "");
    println!("Total: {}", files.len());
    Ok(())
}

/// Folder operations the upload flow needs.
trait ReportStore {
    fn existing_id(&self, name: &str) -> Result<Option<String>>;
    fn upload(&self, bytes: &[u8], name: &str) -> Option<String>;
    fn delete(&self, id: &str) -> bool;
}

impl ReportStore for DriveFolder {
    fn existing_id(&self, name: &str) -> Result<Option<String>> {
        let found = self
            .find_by_name(name)
            .context("Failed to look up existing file")?;
        match found.map(|f| f.locator) {
            Some(Locator::Remote(id)) => Ok(Some(id)),
            Some(Locator::Path(path)) => {
                bail!("remote listing returned a local path: {}", path.display())
            }
            None => Ok(None),
        }
    }

    fn upload(&self, bytes: &[u8], name: &str) -> Option<String> {
        DriveFolder::upload(self, bytes, name)
    }

    fn delete(&self, id: &str) -> bool {
        DriveFolder::delete(self, id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Placement {
    Uploaded {
        id: String,
        /// Previous copy that was removed after the upload
        replaced: Option<String>,
        /// Previous copy that could not be removed
        left_behind: Option<String>,
    },
    AlreadyExists(String),
    Failed,
}

/// Put a validated report into the folder. With `replace`, the old copy is
/// removed only once the new one is stored.
fn place_report(store: &dyn ReportStore, name: &str, bytes: &[u8], replace: bool) -> Result<Placement> {
    let existing = store.existing_id(name)?;
    if let Some(id) = &existing {
        if !replace {
            return Ok(Placement::AlreadyExists(id.clone()));
        }
    }

    let Some(id) = store.upload(bytes, name) else {
        return Ok(Placement::Failed);
    };

    let (replaced, left_behind) = match existing {
        Some(old) if store.delete(&old) => (Some(old), None),
        Some(old) => (None, Some(old)),
        None => (None, None),
    };
    Ok(Placement::Uploaded {
        id,
        replaced,
        left_behind,
    })
}

/// Returns whether the file ended up in the folder.
fn upload_one(folder: &DriveFolder, path: &Path, replace: bool) -> Result<bool> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Invalid file name: {}", path.display()))?;
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

    println!("\n[{}]", name);
    if let Err(rejection) = validate_upload(name, &bytes) {
        println!("  ✗ Rejected: {}", rejection);
        return Ok(false);
    }

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    println!("  Size: {} bytes", bytes.len());
    println!("  Hash: sha256:{:x}", hasher.finalize());

    match place_report(folder, name, &bytes, replace)? {
        Placement::Uploaded {
            id,
            replaced,
            left_behind,
        } => {
            println!("  ✓ Uploaded: {}", id);
            if let Some(old) = replaced {
                println!("  Replaced: {}", old);
            }
            if let Some(old) = left_behind {
                println!("  ⚠ Could not remove previous copy {}", old);
            }
            Ok(true)
        }
        Placement::AlreadyExists(id) => {
            println!("  Already exists: {} (use --replace to overwrite)", id);
            Ok(false)
        }
        Placement::Failed => {
            println!("  ✗ Upload failed");
            Ok(false)
        }
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("collector=info,ingest=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = SourceConfig::from_env().context("Invalid source configuration")?;
    let folder = config.remote().context("Remote folder not configured")?;

    println!("=== Pendency Collector ===");

    match args.command {
        Command::List => list(&folder),
        Command::Upload { files, replace } => {
            if files.is_empty() {
                bail!("No files given");
            }
            let mut uploaded = 0;
            let mut failed = 0;
            for path in &files {
                if upload_one(&folder, path, replace)? {
                    uploaded += 1;
                } else {
                    failed += 1;
                }
            }
            println!("\n=== Upload Summary ===");
            println!("Uploaded: {}", uploaded);
            println!("Failed: {}", failed);
            if failed > 0 {
                bail!("{} file(s) not uploaded", failed);
            }
            Ok(())
        }
        Command::Delete { id } => {
            if !folder.delete(&id) {
                bail!("Failed to delete {}", id);
            }
            println!("Deleted: {}", id);
            Ok(())
        }
    }
}
