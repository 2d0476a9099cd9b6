//! Persistence of the user's ignore list.
//!
//! The on-disk format is a flat JSON array of absolute path strings. Order is
//! irrelevant and duplicates collapse on load.

use crate::error::{DeskError, DeskResult};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Loads and saves the set of ignored paths.
pub trait IgnoreStore: Send + Sync {
    fn load(&self) -> DeskResult<BTreeSet<String>>;
    fn save(&self, paths: &BTreeSet<String>) -> DeskResult<()>;
}

/// Ignore list stored as a JSON file.
#[derive(Debug, Clone)]
pub struct JsonIgnoreStore {
    path: PathBuf,
}

impl JsonIgnoreStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn error(&self, reason: impl ToString) -> DeskError {
        DeskError::IgnoreList {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }
}

impl IgnoreStore for JsonIgnoreStore {
    fn load(&self) -> DeskResult<BTreeSet<String>> {
        if !self.path.exists() {
            return Ok(BTreeSet::new());
        }

        let content = fs::read_to_string(&self.path).map_err(|e| self.error(e))?;
        if content.trim().is_empty() {
            return Ok(BTreeSet::new());
        }

        let paths: Vec<String> = serde_json::from_str(&content)
            .map_err(|e| self.error(format!("JSON parse error: {}", e)))?;
        Ok(paths.into_iter().collect())
    }

    fn save(&self, paths: &BTreeSet<String>) -> DeskResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| self.error(e))?;
        }

        let json = serde_json::to_string_pretty(paths)
            .map_err(|e| self.error(format!("JSON serialization failed: {}", e)))?;
        fs::write(&self.path, json).map_err(|e| self.error(e))
    }
}

/// Ignore list kept in memory only.
#[derive(Debug, Default)]
pub struct MemoryIgnoreStore {
    paths: Mutex<BTreeSet<String>>,
}

impl MemoryIgnoreStore {
    pub fn with_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: Mutex::new(paths.into_iter().map(Into::into).collect()),
        }
    }
}

impl IgnoreStore for MemoryIgnoreStore {
    fn load(&self) -> DeskResult<BTreeSet<String>> {
        Ok(self
            .paths
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone())
    }

    fn save(&self, paths: &BTreeSet<String>) -> DeskResult<()> {
        *self
            .paths
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = paths.clone();
        Ok(())
    }
}
