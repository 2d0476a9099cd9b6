//! Error types shared by every deskclean component.
//!
//! File-system failures are always returned to the immediate caller. The only
//! failure that is swallowed is [`DeskError::PerEntryReadFailure`], which the
//! snapshot reader logs and skips.

use crate::config::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while scanning the watched directory or mutating it.
#[derive(Error, Debug)]
pub enum DeskError {
    /// The watched directory could not be opened (missing, permission denied).
    #[error("Directory unavailable {}: {source}", path.display())]
    DirectoryUnavailable {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Metadata for a single entry could not be read during a scan.
    #[error("Could not read metadata for {}: {source}", path.display())]
    PerEntryReadFailure {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A file could not be moved to the platform trash.
    #[error("Failed to move {} to trash: {reason}", path.display())]
    TrashFailure { path: PathBuf, reason: String },

    /// A file could not be moved into its destination directory.
    #[error("Failed to move {} to {}: {source}", source_path.display(), destination.display())]
    MoveFailure {
        source_path: PathBuf,
        destination: PathBuf,
        source: std::io::Error,
    },

    /// The destination folder could not be created.
    #[error("Failed to create folder {}: {reason}", path.display())]
    FolderCreationFailure { path: PathBuf, reason: String },

    /// The ignore list could not be loaded or saved.
    #[error("Ignore list error at {}: {reason}", path.display())]
    IgnoreList { path: PathBuf, reason: String },

    /// A name given on the command line matched no cleanup candidate.
    #[error("No cleanup candidate named '{name}'")]
    UnknownItem { name: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A background worker panicked or was cancelled.
    #[error("Background task failed: {0}")]
    Task(String),
}

/// Result type for deskclean operations.
pub type DeskResult<T> = Result<T, DeskError>;
