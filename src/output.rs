//! Output formatting and styling module.
//!
//! Provides a centralized interface for all CLI output: colored status lines,
//! the progress bar fed by the organizer, and the end-of-run summary table.

use crate::file_organizer::{FileRecord, OrganizeReport, Outcome, PlannedMove};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

/// Manages all CLI output with consistent styling and formatting.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use tidysort::output::OutputFormatter;
    /// OutputFormatter::success("Directory organized!");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn plain(message: &str) {
        println!("{}", message);
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Creates a percentage progress bar (0 to 100) for an organize run.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use tidysort::output::OutputFormatter;
    /// let pb = OutputFormatter::create_progress_bar();
    /// pb.set_position(40);
    /// pb.finish_with_message("done");
    /// ```
    pub fn create_progress_bar() -> ProgressBar {
        let pb = ProgressBar::new(100);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        pb.set_style(style);
        pb
    }

    /// Prints one line per processed file.
    pub fn record(record: &FileRecord) {
        match &record.outcome {
            Outcome::Moved { destination } => println!(
                " {} {} → {}",
                "✓".green(),
                record.file_name,
                destination.display()
            ),
            Outcome::MovedWithRename { destination } => println!(
                " {} {} → {} {}",
                "✓".green(),
                record.file_name,
                destination.display(),
                "(renamed)".yellow()
            ),
            Outcome::Skipped { reason } => println!(
                " {} {} {}",
                "-".dimmed(),
                record.file_name,
                format!("(skipped: {})", reason).dimmed()
            ),
            Outcome::Failed { error } => eprintln!(" {} {}: {}", "✗".red(), record.file_name, error),
        }
    }

    /// Prints a dry-run line for a planned move.
    pub fn planned(planned: &PlannedMove) {
        match (&planned.category, &planned.destination) {
            (Some(category), Some(destination)) => println!(
                " - {} [{}]\n   → Would move to {}{}",
                planned.file_name,
                category,
                destination.display(),
                if planned.is_rename() { " (renamed)" } else { "" }
            ),
            (Some(category), None) => println!(
                " - {} [{}]\n   → Already in place",
                planned.file_name, category
            ),
            (None, _) => println!(" - {}\n   → No matching category, would stay", planned.file_name),
        }
    }

    /// Prints a summary table with per-category counts and outcome totals.
    pub fn summary_table(report: &OrganizeReport) {
        Self::header("SUMMARY");

        let category_counts = report.category_counts();

        // Calculate column widths
        let width = category_counts
            .keys()
            .map(|name| name.len())
            .max()
            .unwrap_or(0)
            .max(8); // At least "Category" width

        println!("{:<width$} | {}", "Category".bold(), "Files".bold(), width = width);
        println!("{}", "-".repeat(width + 10));

        for (category, count) in &category_counts {
            println!(
                "{:<width$} | {} {}",
                category,
                count.to_string().green(),
                plural(*count),
                width = width
            );
        }

        println!("{}", "-".repeat(width + 10));
        let rows = [
            ("Moved", report.moved()),
            ("Renamed", report.moved_with_rename()),
            ("Skipped", report.skipped()),
            ("Failed", report.failed()),
        ];
        for (label, count) in rows {
            let count_text = if label == "Failed" && count > 0 {
                count.to_string().red().bold()
            } else {
                count.to_string().normal()
            };
            println!("{:<width$} | {} {}", label, count_text, plural(count), width = width);
        }
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            report.total().to_string().green().bold(),
            plural(report.total()),
            width = width
        );
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}
