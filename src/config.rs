//! Runtime configuration for the desktop monitor.
//!
//! Configuration is loaded from TOML. Every field has a default, so an empty
//! file (or no file at all) yields a working setup that watches `~/Desktop`.
//!
//! # Configuration File Format
//!
//! ```toml
//! watched_dir = "/home/me/Desktop"
//! min_age_days = 7
//! stale_offset_days = 14
//! notify_threshold = 15
//! ignore_list_path = "/home/me/.config/deskclean/ignored.json"
//!
//! [sort]
//! key = "date"
//! direction = "desc"
//!
//! [exclude]
//! filenames = ["Thumbs.db", "desktop.ini"]
//! extensions = ["part", "crdownload"]
//! patterns = ["~$*"]
//! regex = []
//! ```

use crate::classify::AgeThreshold;
use crate::sort::{SortDirection, SortKey, SortSpec};
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),
    /// Invalid TOML syntax or structure.
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),
    /// Invalid glob pattern provided.
    #[error("Invalid glob pattern '{0}'")]
    InvalidGlobPattern(String),
    /// Invalid regex pattern provided with the actual error reason.
    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidRegexPattern { pattern: String, reason: String },
    /// IO error while reading configuration.
    #[error("IO error reading configuration: {0}")]
    IoError(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskConfig {
    /// The single directory being monitored.
    pub watched_dir: PathBuf,
    /// Files younger than this are never suggested for cleanup.
    pub min_age_days: u32,
    /// Extra days past `min_age_days` after which the scorer counts a file as old.
    pub stale_offset_days: u32,
    /// Actionable-item count above which the daily notification fires.
    pub notify_threshold: usize,
    /// Where the ignore list is persisted.
    pub ignore_list_path: PathBuf,
    pub sort: SortConfig,
    pub exclude: ExcludeRules,
}

/// Sort settings as written in the config file.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SortConfig {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl From<SortConfig> for SortSpec {
    fn from(config: SortConfig) -> Self {
        SortSpec::new(config.key, config.direction)
    }
}

/// Rules for hiding files from the snapshot entirely.
///
/// Hidden files (leading `.`) are always skipped by the reader; these rules
/// cover platform litter such as `Thumbs.db` or half-finished downloads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExcludeRules {
    /// Exact filenames to exclude.
    pub filenames: Vec<String>,
    /// File extensions to exclude, compared case-insensitively.
    pub extensions: Vec<String>,
    /// Glob patterns matched against the file name.
    pub patterns: Vec<String>,
    /// Regex patterns matched against the file name.
    pub regex: Vec<String>,
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Default for DeskConfig {
    fn default() -> Self {
        let home = home_dir();
        Self {
            watched_dir: home.join("Desktop"),
            min_age_days: 7,
            stale_offset_days: 14,
            notify_threshold: 15,
            ignore_list_path: home.join(".config").join("deskclean").join("ignored.json"),
            sort: SortConfig::default(),
            exclude: ExcludeRules::default(),
        }
    }
}

impl DeskConfig {
    /// Load configuration from a file, with fallback to defaults.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.deskcleanrc.toml` in the current directory
    /// 3. Look for `~/.config/deskclean/config.toml` in home directory
    /// 4. Fall back to default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is explicitly provided but cannot be read,
    /// or if any discovered file is not valid TOML.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(".deskcleanrc.toml");
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        let home_config = home_dir()
            .join(".config")
            .join("deskclean")
            .join("config.toml");
        if home_config.exists() {
            return Self::load_from_file(&home_config);
        }

        Ok(Self::default())
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
    }

    /// The user-facing age filter, clamped to its allowed range.
    pub fn age_threshold(&self) -> AgeThreshold {
        AgeThreshold::new(self.min_age_days)
    }

    /// Compile the exclude rules into matchers used by the snapshot reader.
    ///
    /// # Errors
    ///
    /// Returns an error if any regex or glob patterns are invalid.
    pub fn compile_excludes(&self) -> Result<CompiledExcludes, ConfigError> {
        CompiledExcludes::new(&self.exclude)
    }
}

/// Pre-compiled exclude rules.
#[derive(Debug, Clone, Default)]
pub struct CompiledExcludes {
    filenames: HashSet<String>,
    extensions: HashSet<String>,
    patterns: Vec<Pattern>,
    regexes: Vec<Regex>,
}

impl CompiledExcludes {
    fn new(rules: &ExcludeRules) -> Result<Self, ConfigError> {
        let patterns = rules
            .patterns
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let regexes = rules
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            filenames: rules.filenames.iter().cloned().collect(),
            extensions: rules
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
            patterns,
            regexes,
        })
    }

    /// Returns true if the file should be left out of the snapshot.
    pub fn is_excluded(&self, file_path: &Path) -> bool {
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if self.filenames.contains(file_name.as_ref()) {
            return true;
        }

        if let Some(ext) = file_path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            if self.extensions.contains(&ext_lower) {
                return true;
            }
        }

        if self.patterns.iter().any(|p| p.matches(&file_name)) {
            return true;
        }

        self.regexes.iter().any(|r| r.is_match(&file_name))
    }
}
