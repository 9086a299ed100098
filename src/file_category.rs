//! Extension-based categorization of files.
//!
//! This module turns the category tables of a [`Configuration`] into a
//! matcher that assigns a file name to the first category claiming one of its
//! suffixes, and resolves where that category's files should go.
//!
//! # Examples
//!
//! ```
//! use tidysort::config::Configuration;
//! use tidysort::file_category::CategoryMatcher;
//!
//! let matcher = CategoryMatcher::new(&Configuration::default());
//! assert_eq!(matcher.classify("report.PDF"), Some("Documents"));
//! assert_eq!(matcher.classify("holiday.mkv"), Some("Videos"));
//! assert_eq!(matcher.classify("notes"), None);
//! ```

use crate::config::Configuration;
use std::path::{Path, PathBuf};

/// A category with its normalized extensions and configured destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    /// The category name as written in the configuration.
    pub name: String,
    /// Lower-cased extensions, each starting with ".".
    pub extensions: Vec<String>,
    /// The destination as written in the configuration, if set and not blank.
    pub target_dir: Option<String>,
}

impl Category {
    /// Returns true if the lower-cased file name ends with one of this
    /// category's extensions.
    fn claims(&self, lower_name: &str) -> bool {
        self.extensions.iter().any(|ext| lower_name.ends_with(ext))
    }
}

/// Maps file names to categories in configured order.
#[derive(Debug, Clone)]
pub struct CategoryMatcher {
    categories: Vec<Category>,
}

impl CategoryMatcher {
    /// Builds a matcher from the category tables of a configuration.
    pub fn new(config: &Configuration) -> Self {
        let categories = config
            .file_types
            .iter()
            .map(|(name, extensions)| Category {
                name: name.to_string(),
                extensions: extensions
                    .iter()
                    .filter_map(|ext| normalize_extension(ext))
                    .collect(),
                // A blank destination means none
                target_dir: config
                    .target_dirs
                    .get(name)
                    .filter(|dir| !dir.trim().is_empty())
                    .cloned(),
            })
            .collect();

        Self { categories }
    }

    /// Returns the categories in matching order.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Returns the name of the first category whose extensions match the end
    /// of `file_name`, compared case-insensitively.
    ///
    /// # Examples
    ///
    /// ```
    /// use tidysort::config::Configuration;
    /// use tidysort::file_category::CategoryMatcher;
    ///
    /// let matcher = CategoryMatcher::new(&Configuration::default());
    /// assert_eq!(matcher.classify("backup.tar.gz"), Some("Archives"));
    /// assert_eq!(matcher.classify("song.Mp3"), Some("Music"));
    /// ```
    pub fn classify(&self, file_name: &str) -> Option<&str> {
        let lower_name = file_name.to_lowercase();
        self.categories
            .iter()
            .find(|category| category.claims(&lower_name))
            .map(|category| category.name.as_str())
    }

    /// Resolves the destination directory for `category`.
    ///
    /// Categories without a configured destination, or with a blank one,
    /// resolve to `source_dir`.
    pub fn destination_for(&self, category: &str, source_dir: &Path) -> PathBuf {
        self.categories
            .iter()
            .find(|c| c.name == category)
            .and_then(|c| c.target_dir.as_deref())
            .map(expand_home)
            .unwrap_or_else(|| source_dir.to_path_buf())
    }
}

/// Lower-cases an extension and makes sure it starts with ".".
///
/// Blank entries are dropped, since an empty suffix would match every file.
fn normalize_extension(ext: &str) -> Option<String> {
    let ext = ext.trim().to_lowercase();
    if ext.is_empty() || ext == "." {
        None
    } else if ext.starts_with('.') {
        Some(ext)
    } else {
        Some(format!(".{}", ext))
    }
}

/// Expands a leading `~` to the current user's home directory.
///
/// Paths without the shorthand, and all paths when the home directory is
/// unknown, are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    let rest = if path == "~" {
        Some("")
    } else {
        path.strip_prefix("~/")
            .or_else(|| path.strip_prefix("~\\"))
    };

    match (rest, dirs::home_dir()) {
        (Some(""), Some(home)) => home,
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
