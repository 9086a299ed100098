//! Command-line interface module for tidysort.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing
//! - Configuration loading
//! - Organization orchestration with a progress bar
//! - Dry-run previews

use crate::config::{ConfigError, Configuration, load_or_create_config};
use crate::file_category::expand_home;
use crate::file_organizer::{FileOrganizer, OrganizeError};
use crate::logging::{DEFAULT_LOG_FILE, LoggingError};
use crate::output::OutputFormatter;
use clap::Parser;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Move files into category folders by extension.
#[derive(Debug, Clone, Parser)]
#[command(name = "tidysort", version, about)]
pub struct Cli {
    /// Directory to organize (defaults to `base_dir` from the configuration)
    pub directory: Option<PathBuf>,

    /// Configuration file, created with defaults if missing
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// Append-only event log
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,

    /// Show what would be moved without touching any file
    #[arg(long)]
    pub dry_run: bool,

    /// Print the report as JSON instead of a table
    #[arg(long)]
    pub json: bool,

    /// Only print errors
    #[arg(short, long)]
    pub quiet: bool,
}

/// Errors surfaced to the user by the command-line front end.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Error loading configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Organize(#[from] OrganizeError),
    #[error("Error setting up logging: {0}")]
    Logging(#[from] LoggingError),
    #[error("Error writing JSON report: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{failed} of {total} files could not be organized")]
    IncompleteRun { failed: usize, total: usize },
}

/// Runs the CLI application for parsed arguments.
///
/// Logging is expected to be initialized by the caller.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use tidysort::cli::{Cli, run_cli};
///
/// let cli = Cli::parse_from(["tidysort", "/path/to/directory", "--dry-run"]);
/// match run_cli(&cli) {
///     Ok(()) => println!("Operation completed successfully"),
///     Err(e) => eprintln!("Error: {}", e),
/// }
/// ```
pub fn run_cli(cli: &Cli) -> Result<(), CliError> {
    let config = load_or_create_config(&cli.config)?;
    let directory = cli
        .directory
        .clone()
        .unwrap_or_else(|| expand_home(&config.base_dir));

    if cli.dry_run {
        preview_directory(&directory, &config, cli)
    } else {
        organize_directory(&directory, &config, cli)
    }
}

/// Organizes `directory`, rendering progress and a summary.
///
/// Returns `CliError::IncompleteRun` when any file failed to move, after the
/// full report has been printed.
pub fn organize_directory(
    directory: &Path,
    config: &Configuration,
    cli: &Cli,
) -> Result<(), CliError> {
    let organizer = FileOrganizer::new(config)?;
    let show_progress = !cli.quiet && !cli.json;

    if show_progress {
        OutputFormatter::info(&format!("Organizing contents of: {}", directory.display()));
    }

    let progress_bar = show_progress.then(OutputFormatter::create_progress_bar);
    let report = organizer.organize(directory, |percent| {
        if let Some(pb) = &progress_bar {
            pb.set_position(u64::from(percent));
        }
    })?;
    if let Some(pb) = progress_bar {
        pb.set_position(u64::from(report.progress()));
        pb.finish_and_clear();
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !cli.quiet {
        if report.records.is_empty() {
            OutputFormatter::plain("No files found to organize.");
        }
        for record in &report.records {
            OutputFormatter::record(record);
        }
        OutputFormatter::summary_table(&report);
    }

    if !report.is_success() {
        if !cli.quiet && !cli.json {
            OutputFormatter::warning("Some files could not be organized. Please review errors above.");
        }
        return Err(CliError::IncompleteRun {
            failed: report.failed(),
            total: report.total(),
        });
    }

    if !cli.quiet && !cli.json {
        OutputFormatter::success("Organization complete!");
        OutputFormatter::plain(&format!("Log written to {}", cli.log_file.display()));
    }
    Ok(())
}

/// Shows where each file would go without moving anything.
pub fn preview_directory(
    directory: &Path,
    config: &Configuration,
    cli: &Cli,
) -> Result<(), CliError> {
    info!(directory = %directory.display(), "Dry run");
    let planned = FileOrganizer::new(config)?.plan(directory)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&planned)?);
        return Ok(());
    }
    if cli.quiet {
        return Ok(());
    }

    OutputFormatter::dry_run_notice(&format!("Analyzing contents of: {}", directory.display()));
    if planned.is_empty() {
        OutputFormatter::plain("No files found to organize.");
        return Ok(());
    }

    for entry in &planned {
        OutputFormatter::planned(entry);
    }

    let moving = planned.iter().filter(|p| p.destination.is_some()).count();
    OutputFormatter::header("DRY RUN SUMMARY");
    OutputFormatter::plain(&format!("Total files: {}", planned.len()));
    OutputFormatter::plain(&format!("Would move: {}", moving));
    OutputFormatter::plain(&format!("Would stay: {}", planned.len() - moving));
    OutputFormatter::success("Dry run complete. No files were modified.");

    Ok(())
}
