//! tidysort - move files into category folders by extension
//!
//! This library loads an editable JSON table of categories (extensions and
//! destination directories), classifies the files of a directory against it
//! and moves each file into its category's destination, reporting progress
//! and a per-file outcome.

pub mod cli;
pub mod config;
pub mod file_category;
pub mod file_organizer;
pub mod logging;
pub mod output;

pub use config::{ConfigError, Configuration, load_or_create_config};
pub use file_category::CategoryMatcher;
pub use file_organizer::{
    FileOrganizer, FileRecord, FileSystemError, OrganizeError, OrganizeReport, OrganizeSummary,
    Outcome, SkipReason, organize, plan,
};

pub use cli::{Cli, run_cli};
