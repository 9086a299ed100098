//! File organization: moving files into their category directories.
//!
//! This module lists the regular files directly inside a directory, classifies
//! each one by extension and moves it into the destination configured for its
//! category. Name collisions at the destination are resolved by renaming, and
//! a failure on one file never stops the rest of the run.

use crate::config::{CompiledFilters, ConfigError, Configuration};
use crate::file_category::CategoryMatcher;
use chrono::{DateTime, Local};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashSet};
use std::env;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// A single file could not be moved.
#[derive(Debug, Error)]
pub enum FileSystemError {
    /// Failed to create a destination directory.
    #[error("Failed to create directory {}: {source}", .path.display())]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Failed to move a file to its destination.
    #[error("Failed to move {} to {}: {source}", .from.display(), .to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Errors that abort an organize run before any file is touched.
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// The directory does not exist, is not a directory or cannot be read.
    #[error("Invalid directory {}: {source}", .path.display())]
    InvalidDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The configuration could not be compiled.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for file organization operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// Why a file was left where it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No category claims the file's extension.
    NoMatchingCategory,
    /// The category's destination is the source directory itself.
    AlreadyInDestination,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoMatchingCategory => write!(f, "no matching extension"),
            SkipReason::AlreadyInDestination => write!(f, "already in its destination"),
        }
    }
}

/// What happened to one file during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// Moved under its own name.
    Moved { destination: PathBuf },
    /// Moved under a `_copy` name because its name was taken.
    MovedWithRename { destination: PathBuf },
    /// Left in place.
    Skipped { reason: SkipReason },
    /// The move was attempted and failed.
    Failed { error: String },
}

/// The outcome for one file, in processing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    /// The file name as found in the source directory.
    pub file_name: String,
    /// The full path the file had before the run.
    pub source: PathBuf,
    /// The matched category, if any.
    pub category: Option<String>,
    pub outcome: Outcome,
}

/// Outcome totals of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrganizeSummary {
    pub moved: usize,
    pub moved_with_rename: usize,
    pub skipped: usize,
    pub failed: usize,
    pub total: usize,
}

/// The result of one organize run.
///
/// Serializes with a `summary` object next to the per-file records.
#[derive(Debug, Clone)]
pub struct OrganizeReport {
    /// The directory that was organized.
    pub directory: PathBuf,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    /// One record per eligible file.
    pub records: Vec<FileRecord>,
}

impl OrganizeReport {
    fn count(&self, predicate: impl Fn(&Outcome) -> bool) -> usize {
        self.records.iter().filter(|r| predicate(&r.outcome)).count()
    }

    /// Number of files moved under their own name.
    pub fn moved(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Moved { .. }))
    }

    /// Number of files moved under a collision-free name.
    pub fn moved_with_rename(&self) -> usize {
        self.count(|o| matches!(o, Outcome::MovedWithRename { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed { .. }))
    }

    /// Total number of files processed.
    pub fn total(&self) -> usize {
        self.records.len()
    }

    /// Completion percentage. A report only exists once every file has been
    /// handled, so this is 100, including for an empty run.
    pub fn progress(&self) -> u8 {
        100
    }

    pub fn summary(&self) -> OrganizeSummary {
        OrganizeSummary {
            moved: self.moved(),
            moved_with_rename: self.moved_with_rename(),
            skipped: self.skipped(),
            failed: self.failed(),
            total: self.total(),
        }
    }

    /// Returns true if no file failed to move.
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// Number of files that left the source directory, per category.
    pub fn category_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            if let (Some(category), Outcome::Moved { .. } | Outcome::MovedWithRename { .. }) =
                (&record.category, &record.outcome)
            {
                *counts.entry(category.clone()).or_insert(0) += 1;
            }
        }
        counts
    }
}

impl Serialize for OrganizeReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("OrganizeReport", 5)?;
        state.serialize_field("directory", &self.directory)?;
        state.serialize_field("started_at", &self.started_at)?;
        state.serialize_field("finished_at", &self.finished_at)?;
        state.serialize_field("summary", &self.summary())?;
        state.serialize_field("records", &self.records)?;
        state.end()
    }
}

/// Where a file would go if the directory were organized now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedMove {
    pub file_name: String,
    pub source: PathBuf,
    /// The matched category, if any.
    pub category: Option<String>,
    /// The final path, or `None` if the file stays where it is.
    pub destination: Option<PathBuf>,
}

impl PlannedMove {
    /// Returns true if the planned destination uses a collision-free name.
    pub fn is_rename(&self) -> bool {
        self.destination
            .as_deref()
            .and_then(Path::file_name)
            .is_some_and(|name| name.to_string_lossy() != self.file_name)
    }
}

/// Organizes the files of a directory according to a configuration.
///
/// This is a convenience wrapper around [`FileOrganizer`].
///
/// # Examples
///
/// ```no_run
/// use tidysort::config::Configuration;
/// use tidysort::file_organizer::organize;
/// use std::path::Path;
///
/// let config = Configuration::default();
/// let report = organize(Path::new("/home/user/Downloads"), &config, |percent| {
///     println!("{}%", percent);
/// });
///
/// match report {
///     Ok(report) => println!("Moved {} files", report.moved() + report.moved_with_rename()),
///     Err(e) => eprintln!("Organization failed: {}", e),
/// }
/// ```
pub fn organize<F>(
    directory: &Path,
    config: &Configuration,
    on_progress: F,
) -> OrganizeResult<OrganizeReport>
where
    F: FnMut(u8),
{
    FileOrganizer::new(config)?.organize(directory, on_progress)
}

/// Computes where each file of `directory` would be moved, without touching
/// the filesystem.
pub fn plan(directory: &Path, config: &Configuration) -> OrganizeResult<Vec<PlannedMove>> {
    FileOrganizer::new(config)?.plan(directory)
}

/// Moves files into category directories.
///
/// Holds the compiled category matcher and exclude filters so that several
/// directories can be organized with a single configuration.
#[derive(Debug)]
pub struct FileOrganizer {
    matcher: CategoryMatcher,
    filters: CompiledFilters,
    own_executable: Option<PathBuf>,
}

impl FileOrganizer {
    /// Compiles a configuration into an organizer.
    ///
    /// # Errors
    ///
    /// Returns `OrganizeError::Config` if an exclude pattern is invalid.
    pub fn new(config: &Configuration) -> OrganizeResult<Self> {
        Ok(Self {
            matcher: CategoryMatcher::new(config),
            filters: config.compile_filters()?,
            own_executable: env::current_exe()
                .and_then(fs::canonicalize)
                .ok(),
        })
    }

    /// Organizes the regular files directly inside `directory`.
    ///
    /// `on_progress` is called once per file, after the file is handled, with
    /// the rounded completion percentage. It is not called when there are no
    /// eligible files.
    ///
    /// # Errors
    ///
    /// Returns `OrganizeError::InvalidDirectory` if `directory` cannot be
    /// listed. Per-file failures are reported as [`Outcome::Failed`].
    pub fn organize<F>(&self, directory: &Path, mut on_progress: F) -> OrganizeResult<OrganizeReport>
    where
        F: FnMut(u8),
    {
        let started_at = Local::now();
        let files = self.eligible_files(directory)?;
        let source_dir = fs::canonicalize(directory).unwrap_or_else(|_| directory.to_path_buf());

        info!(
            directory = %directory.display(),
            files = files.len(),
            "Organizing directory"
        );

        let total = files.len();
        let mut records = Vec::with_capacity(total);
        for (index, path) in files.into_iter().enumerate() {
            records.push(self.process_file(directory, &source_dir, path));
            on_progress(percent(index + 1, total));
        }

        let report = OrganizeReport {
            directory: directory.to_path_buf(),
            started_at,
            finished_at: Local::now(),
            records,
        };

        info!(
            directory = %directory.display(),
            moved = report.moved(),
            renamed = report.moved_with_rename(),
            skipped = report.skipped(),
            failed = report.failed(),
            "Organization finished"
        );

        Ok(report)
    }

    /// Computes the destination of every eligible file without moving anything.
    pub fn plan(&self, directory: &Path) -> OrganizeResult<Vec<PlannedMove>> {
        let files = self.eligible_files(directory)?;
        let source_dir = fs::canonicalize(directory).unwrap_or_else(|_| directory.to_path_buf());
        let mut claimed: HashSet<PathBuf> = HashSet::new();

        let planned = files
            .into_iter()
            .map(|path| {
                let file_name = display_name(&path);
                let category = self.matcher.classify(&file_name).map(str::to_string);

                let destination = category.as_deref().and_then(|category| {
                    let dir = self.matcher.destination_for(category, directory);
                    if is_same_directory(&dir, &source_dir) {
                        return None;
                    }
                    let name = path.file_name()?;
                    let (target, _) =
                        resolve_target(&dir, name, |p| claimed.contains(p) || is_occupied(p));
                    claimed.insert(target.clone());
                    Some(target)
                });

                PlannedMove {
                    file_name,
                    source: path,
                    category,
                    destination,
                }
            })
            .collect();

        Ok(planned)
    }

    /// Lists the regular files of `directory` that take part in a run, sorted
    /// by name.
    fn eligible_files(&self, directory: &Path) -> OrganizeResult<Vec<PathBuf>> {
        let entries = fs::read_dir(directory).map_err(|source| OrganizeError::InvalidDirectory {
            path: directory.to_path_buf(),
            source,
        })?;

        let mut files = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            // Follows links: a link to a regular file is organized, and the
            // link itself is what gets moved.
            if path.is_file() {
                let file_name = entry.file_name();

                if !self.filters.should_include(&file_name.to_string_lossy()) {
                    debug!(file = %path.display(), "Excluded by filter rules");
                    continue;
                }
                if is_own_executable(&path, self.own_executable.as_deref()) {
                    debug!(file = %path.display(), "Excluded running executable");
                    continue;
                }
                files.push(path);
            }
        }

        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(files)
    }

    /// Classifies and moves one file, recording what happened.
    fn process_file(&self, directory: &Path, source_dir: &Path, path: PathBuf) -> FileRecord {
        let file_name = display_name(&path);

        let Some(category) = self.matcher.classify(&file_name) else {
            info!(file = %file_name, "Skipped {}: no matching extension", file_name);
            return FileRecord {
                file_name,
                source: path,
                category: None,
                outcome: Outcome::Skipped {
                    reason: SkipReason::NoMatchingCategory,
                },
            };
        };

        let destination_dir = self.matcher.destination_for(category, directory);
        let outcome = if is_same_directory(&destination_dir, source_dir) {
            info!(
                file = %file_name,
                category,
                "Skipped {}: destination is the source directory",
                file_name
            );
            Outcome::Skipped {
                reason: SkipReason::AlreadyInDestination,
            }
        } else {
            match move_into(&path, &destination_dir) {
                Ok((destination, false)) => {
                    info!(
                        file = %file_name,
                        category,
                        "Moved {} to {}",
                        file_name,
                        destination_dir.display()
                    );
                    Outcome::Moved { destination }
                }
                Ok((destination, true)) => {
                    info!(
                        file = %file_name,
                        category,
                        "Renamed and moved {} to {} due to conflict",
                        file_name,
                        destination.display()
                    );
                    Outcome::MovedWithRename { destination }
                }
                Err(e) => {
                    warn!(file = %file_name, category, "Could not organize {}: {}", file_name, e);
                    Outcome::Failed {
                        error: e.to_string(),
                    }
                }
            }
        };

        FileRecord {
            file_name,
            source: path,
            category: Some(category.to_string()),
            outcome,
        }
    }
}

/// Rounded percentage of `done` out of `total`. `total` must be non-zero.
fn percent(done: usize, total: usize) -> u8 {
    ((done * 200 + total) / (total * 2)).min(100) as u8
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn is_own_executable(path: &Path, own_executable: Option<&Path>) -> bool {
    let Some(own) = own_executable else {
        return false;
    };
    if path.file_name() != own.file_name() {
        return false;
    }
    fs::canonicalize(path).is_ok_and(|p| p == own)
}

/// `source_dir` must already be canonical.
fn is_same_directory(dir: &Path, source_dir: &Path) -> bool {
    fs::canonicalize(dir).is_ok_and(|d| d == source_dir)
}

/// True if anything, including a dangling symlink, occupies `path`.
fn is_occupied(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

/// Builds `<stem><suffix>.<ext>` from a file name.
fn with_name_suffix(file_name: &OsStr, suffix: &str) -> OsString {
    let path = Path::new(file_name);
    let mut name = path
        .file_stem()
        .map(OsStr::to_os_string)
        .unwrap_or_default();
    name.push(suffix);
    if let Some(ext) = path.extension() {
        name.push(".");
        name.push(ext);
    }
    name
}

/// Picks the path a file named `file_name` gets inside `dir`.
///
/// The plain name is used when free. Otherwise `_copy` is inserted before the
/// extension, then `_copy_2`, `_copy_3` and so on until a free name is found.
/// Returns the path and whether it differs from the plain name.
fn resolve_target(
    dir: &Path,
    file_name: &OsStr,
    is_taken: impl Fn(&Path) -> bool,
) -> (PathBuf, bool) {
    let plain = dir.join(file_name);
    if !is_taken(&plain) {
        return (plain, false);
    }

    let mut candidate = dir.join(with_name_suffix(file_name, "_copy"));
    let mut counter = 2;
    while is_taken(&candidate) {
        candidate = dir.join(with_name_suffix(file_name, &format!("_copy_{}", counter)));
        counter += 1;
    }
    (candidate, true)
}

/// Moves `path` into `destination_dir`, creating the directory if needed.
///
/// Returns the final path and whether the file had to be renamed.
fn move_into(path: &Path, destination_dir: &Path) -> Result<(PathBuf, bool), FileSystemError> {
    if !destination_dir.is_dir() {
        fs::create_dir_all(destination_dir).map_err(|source| {
            FileSystemError::DirectoryCreation {
                path: destination_dir.to_path_buf(),
                source,
            }
        })?;
    }

    let file_name = path.file_name().ok_or_else(|| FileSystemError::Move {
        from: path.to_path_buf(),
        to: destination_dir.to_path_buf(),
        source: io::Error::new(io::ErrorKind::InvalidInput, "file has no name component"),
    })?;

    let (target, renamed) = resolve_target(destination_dir, file_name, is_occupied);

    move_file(path, &target).map_err(|source| FileSystemError::Move {
        from: path.to_path_buf(),
        to: target.clone(),
        source,
    })?;

    Ok((target, renamed))
}

/// Renames `from` to `to`, copying and deleting when they are on different
/// filesystems.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            copy_then_remove(from, to, |from, to| fs::copy(from, to))
        }
        Err(e) => Err(e),
    }
}

/// Copies `from` to `to` with `copy`, then removes `from`.
///
/// On any error `to` is removed again, so the source stays the only copy.
/// `to` must be a path nothing occupied before the call.
fn copy_then_remove<C>(from: &Path, to: &Path, copy: C) -> io::Result<()>
where
    C: FnOnce(&Path, &Path) -> io::Result<u64>,
{
    let result = copy(from, to).and_then(|_| fs::remove_file(from));
    if result.is_err() && is_occupied(to) {
        let _ = fs::remove_file(to);
    }
    result
}
