//! Ingest - Builds the pendency dataset from spreadsheet reports
//!
//! Usage:
//!   # Local folder (DATA_DIR or --data-dir):
//!   cargo run --bin ingest -- run --source local --data-dir ./data
//!
//!   # Remote folder, falling back to the local folder when it yields nothing:
//!   cargo run --bin ingest -- run --source hybrid --export out.csv
//!
//!   # Change-detection fingerprint of the configured source:
//!   cargo run --bin ingest -- fingerprint

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ingest::config::{PipelineConfig, SourceConfig, SourceKind};
use ingest::pipeline::{FileOutcome, Pipeline, RunReport, RunStatus};
use ingest::source::{FileOrder, FileSource, SourceFingerprint};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::warn;

#[derive(Parser, Debug)]
#[command(name = "ingest", about = "Builds the pendency dataset from spreadsheet reports")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the pipeline once and print what was accepted and rejected
    Run(RunArgs),
    /// Print the fingerprint of the current listing
    Fingerprint(SourceArgs),
}

#[derive(clap::Args, Debug)]
struct SourceArgs {
    /// local, remote or hybrid (overrides SOURCE_KIND)
    #[arg(long)]
    source: Option<SourceKind>,

    /// Local report folder (overrides DATA_DIR)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// name or modified-desc (defaults to the origin's own order)
    #[arg(long)]
    order: Option<FileOrder>,
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Write the combined dataset to this CSV file
    #[arg(long)]
    export: Option<PathBuf>,

    /// Print the full run report as JSON instead of the summary
    #[arg(long, default_value = "false")]
    json: bool,

    /// In hybrid mode, do not read the local folder when the remote one is empty
    #[arg(long, default_value = "false")]
    no_fallback: bool,
}

fn source_config(args: &SourceArgs) -> Result<SourceConfig> {
    let mut config = SourceConfig::from_env().context("Invalid source configuration")?;
    if let Some(kind) = args.source {
        config.kind = kind;
    }
    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.clone();
    }
    Ok(config)
}

fn run(args: RunArgs) -> Result<()> {
    let config = source_config(&args.source)?;
    let pipeline = Pipeline::new(PipelineConfig {
        order: args.source.order,
        fallback_on_empty: !args.no_fallback,
    });

    if !args.json {
        println!("=== Pendency Ingest ===");
        println!("Source: {:?}", config.kind);
        println!("Data dir: {}", config.data_dir.display());
    }

    let local = config.local();
    let report = match config.kind {
        SourceKind::Local => pipeline.run(&local),
        SourceKind::Remote => {
            let remote = config.remote().context("Remote source not configured")?;
            pipeline.run(&remote)
        }
        SourceKind::Hybrid => match config.remote() {
            Ok(remote) => pipeline.run_with_fallback(&remote, &local),
            Err(e) => {
                warn!(error = %e, "remote source unavailable, reading local folder only");
                pipeline.run(&local)
            }
        },
    };

    if let Some(path) = &args.export {
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        report
            .dataset
            .write_csv(BufWriter::new(file))
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
        if let Some(path) = &args.export {
            println!("Exported: {}", path.display());
        }
    }

    if let Some(fatal) = &report.fatal {
        bail!("Run failed: {}", fatal);
    }
    Ok(())
}

fn print_report(report: &RunReport) {
    if let Some(primary) = &report.fell_back_from {
        println!("\n{} yielded no data, read {} instead", primary, report.source);
    }
    if let Some(listing) = &report.listing_error {
        println!("\n⚠ Could not list {}: {}", report.source, listing);
    }

    println!("\nFiles:");
    println!("{:-<60}", "");
    for outcome in &report.outcomes {
        match outcome {
            FileOutcome::Accepted { file, records } => {
                println!("  ✓ {} ({} rows)", file, records)
            }
            FileOutcome::Rejected { file, reason } => println!("  ✗ {}: {}", file, reason),
        }
    }
    println!("{:-<60}", "");

    let summary = report.summary();
    println!("\n=== Run Summary ===");
    println!("Listed: {}", summary.files_listed);
    println!("Accepted: {}", summary.files_accepted);
    println!("Rejected: {}", summary.files_rejected);
    println!("Rows: {}", summary.records);
    println!("Fingerprint: {}", report.fingerprint);
    match summary.status {
        RunStatus::Completed => println!("Status: completed"),
        RunStatus::NoData => println!("Status: no data"),
        RunStatus::Fatal => println!("Status: FAILED"),
    }
}

fn fingerprint(args: SourceArgs) -> Result<()> {
    let config = source_config(&args)?;
    let pipeline = Pipeline::new(PipelineConfig {
        order: args.order,
        ..PipelineConfig::default()
    });

    let source: Box<dyn FileSource> = match config.kind {
        SourceKind::Local => Box::new(config.local()),
        SourceKind::Remote => Box::new(config.remote().context("Remote source not configured")?),
        SourceKind::Hybrid => match config.remote() {
            Ok(remote) => Box::new(remote),
            Err(e) => {
                warn!(error = %e, "remote source unavailable, using local folder");
                Box::new(config.local())
            }
        },
    };

    let files = pipeline
        .list(source.as_ref())
        .with_context(|| format!("Failed to list {}", source.describe()))?;
    println!("{}", SourceFingerprint::compute(&files));
    Ok(())
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ingest=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match args.command {
        Command::Run(run_args) => run(run_args),
        Command::Fingerprint(source_args) => fingerprint(source_args),
    }
}
