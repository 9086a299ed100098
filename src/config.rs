//! Category configuration and file exclusion rules.
//!
//! The configuration is a JSON document mapping category names to the
//! extensions they claim and to the directory their files are moved into.
//! When no configuration exists yet, a default one is written to disk first so
//! the user has something to edit.
//!
//! # Configuration File Format
//!
//! ```json
//! {
//!     "base_dir": "~/Downloads",
//!     "file_types": {
//!         "Documents": [".pdf", ".docx", ".txt"],
//!         "Videos": [".mp4", ".mkv"]
//!     },
//!     "target_dirs": {
//!         "Documents": "~/Documents",
//!         "Videos": "~/Videos"
//!     },
//!     "exclude": {
//!         "filenames": ["desktop.ini"],
//!         "patterns": ["*.part"],
//!         "regex": [],
//!         "skip_hidden": true
//!     }
//! }
//! ```
//!
//! The `exclude` section is optional. Category order in `file_types` is
//! significant: the first category claiming an extension wins.

use glob::Pattern;
use regex::Regex;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur while loading, creating or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file exists but could not be read.
    #[error("Failed to read configuration {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The default configuration could not be written.
    #[error("Failed to write configuration {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Invalid JSON syntax or structure.
    #[error("Invalid configuration {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// The configuration could not be serialized.
    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[source] serde_json::Error),
    /// An exclude glob pattern does not compile.
    #[error("Invalid glob pattern '{pattern}': {source}")]
    InvalidGlobPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    /// An exclude regex does not compile.
    #[error("Invalid regex pattern '{pattern}': {source}")]
    InvalidRegexPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// A string-keyed map that keeps its entries in insertion order.
///
/// JSON objects in the configuration are read and written in the order the
/// user wrote them. Inserting an existing key replaces its value in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedMap<V> {
    entries: Vec<(String, V)>,
}

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Inserts `value` under `key`, keeping the original position of an existing key.
    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for OrderedMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct OrderedMapVisitor<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
    type Value = OrderedMap<V>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a JSON object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut map = OrderedMap::new();
        while let Some((key, value)) = access.next_entry::<String, V>()? {
            map.insert(key, value);
        }
        Ok(map)
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

/// The persisted category configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Suggested directory to organize when the caller names none.
    #[serde(default = "default_base_dir")]
    pub base_dir: String,

    /// Category name to the extensions it claims, in matching order.
    pub file_types: OrderedMap<Vec<String>>,

    /// Category name to its destination directory (`~` is allowed).
    #[serde(default)]
    pub target_dirs: OrderedMap<String>,

    /// Files that are never touched by an organize run.
    #[serde(default, skip_serializing_if = "ExcludeRules::is_empty")]
    pub exclude: ExcludeRules,
}

fn default_base_dir() -> String {
    "~/Downloads".to_string()
}

/// Rules for keeping files out of an organize run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludeRules {
    /// Exact filenames to exclude (e.g., "desktop.ini").
    #[serde(default)]
    pub filenames: Vec<String>,

    /// Glob patterns matched against the file name (e.g., "*.part").
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Regex patterns matched against the file name.
    #[serde(default)]
    pub regex: Vec<String>,

    /// Whether files starting with "." are left alone. Defaults to false.
    #[serde(default)]
    pub skip_hidden: bool,
}

impl ExcludeRules {
    pub fn is_empty(&self) -> bool {
        self.filenames.is_empty()
            && self.patterns.is_empty()
            && self.regex.is_empty()
            && !self.skip_hidden
    }
}

impl Default for Configuration {
    fn default() -> Self {
        let table: [(&str, &[&str], &str); 7] = [
            (
                "Documents",
                &[".pdf", ".docx", ".txt", ".xlsx", ".pptx", ".doc"],
                "~/Documents",
            ),
            ("Videos", &[".mp4", ".mkv", ".mov", ".avi"], "~/Videos"),
            (
                "Pictures",
                &[".jpg", ".jpeg", ".png", ".gif", ".bmp"],
                "~/Pictures",
            ),
            ("Music", &[".mp3", ".wav", ".flac", ".aac"], "~/Music"),
            (
                "Archives",
                &[".zip", ".rar", ".7z", ".tar", ".gz"],
                "~/Downloads/Archives",
            ),
            (
                "Programs",
                &[".exe", ".msi", ".sh", ".bat"],
                "~/Downloads/Programs",
            ),
            (
                "MayaProjects",
                &[".ma", ".mb", ".obj", ".fbx"],
                "~/Documents/Maya",
            ),
        ];

        Self {
            base_dir: default_base_dir(),
            file_types: table
                .iter()
                .map(|(name, exts, _)| (*name, exts.iter().map(|e| e.to_string()).collect()))
                .collect(),
            target_dirs: table
                .iter()
                .map(|(name, _, dir)| (*name, dir.to_string()))
                .collect(),
            exclude: ExcludeRules::default(),
        }
    }
}

impl Configuration {
    /// Loads configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Read` if the file cannot be read and
    /// `ConfigError::Parse` if it is not a valid configuration document.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Writes this configuration as four-space indented JSON, creating parent
    /// directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }

        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        self.serialize(&mut serializer)
            .map_err(ConfigError::Serialize)?;
        buffer.push(b'\n');

        fs::write(path, buffer).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Compiles the exclude rules into matchers.
    ///
    /// # Errors
    ///
    /// Returns an error if any glob or regex pattern is invalid.
    pub fn compile_filters(&self) -> Result<CompiledFilters, ConfigError> {
        CompiledFilters::new(&self.exclude)
    }
}

/// Loads the configuration at `path`, writing the default one first if the
/// file does not exist yet.
///
/// Exclude patterns are validated here so that a bad pattern is reported at
/// startup instead of in the middle of a run.
///
/// # Examples
///
/// ```no_run
/// use tidysort::config::load_or_create_config;
/// use std::path::Path;
///
/// let config = load_or_create_config(Path::new("config.json")).expect("config");
/// println!("{} categories", config.file_types.len());
/// ```
pub fn load_or_create_config(path: &Path) -> Result<Configuration, ConfigError> {
    if path.exists() {
        debug!(path = %path.display(), "Loading existing configuration");
    } else {
        Configuration::default().save(path)?;
        info!(path = %path.display(), "Default configuration created");
    }

    let config = Configuration::load(path)?;
    config.compile_filters()?;
    Ok(config)
}

/// Exclude rules compiled for matching against file names.
#[derive(Debug)]
pub struct CompiledFilters {
    skip_hidden: bool,
    exclude_filenames: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
}

impl CompiledFilters {
    fn new(rules: &ExcludeRules) -> Result<Self, ConfigError> {
        let exclude_patterns = rules
            .patterns
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|source| ConfigError::InvalidGlobPattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let exclude_regexes = rules
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            skip_hidden: rules.skip_hidden,
            exclude_filenames: rules.filenames.iter().cloned().collect(),
            exclude_patterns,
            exclude_regexes,
        })
    }

    /// Checks whether a file with this name takes part in an organize run.
    ///
    /// Checks are performed in this order, with early termination:
    /// 1. Hidden file filter
    /// 2. Exact filename match
    /// 3. Glob pattern match
    /// 4. Regex pattern match
    pub fn should_include(&self, file_name: &str) -> bool {
        if self.skip_hidden && file_name.starts_with('.') {
            return false;
        }

        if self.exclude_filenames.contains(file_name) {
            return false;
        }

        if self
            .exclude_patterns
            .iter()
            .any(|pattern| pattern.matches(file_name))
        {
            return false;
        }

        !self
            .exclude_regexes
            .iter()
            .any(|regex| regex.is_match(file_name))
    }
}
