//! Directory snapshot acquisition.
//!
//! A snapshot is one full, non-recursive enumeration of the watched directory.
//! Every call produces brand-new [`Item`]s with fresh IDs; nothing is carried
//! over from a previous snapshot.

use crate::config::CompiledExcludes;
use crate::error::{DeskError, DeskResult};
use chrono::{DateTime, Utc};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};
use uuid::Uuid;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Opaque identity of an item within a single snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(Uuid);

impl ItemId {
    fn fresh() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One regular file found in the watched directory.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: ItemId,
    pub path: PathBuf,
    pub modified: DateTime<Utc>,
    pub size: u64,
    /// Whole days between `modified` and the snapshot time.
    pub age_days: u32,
}

impl Item {
    /// Builds an item with a fresh ID, deriving its age from `now`.
    pub fn new(path: PathBuf, modified: DateTime<Utc>, size: u64, now: DateTime<Utc>) -> Self {
        Self {
            id: ItemId::fresh(),
            path,
            modified,
            size,
            age_days: age_in_days(modified, now),
        }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Lowercased extension, empty when the file has none.
    pub fn extension(&self) -> String {
        self.path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    }

    /// The path as the string used for ignore-list membership.
    pub fn path_key(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

/// Whole days elapsed from `modified` to `now`. Future timestamps count as zero.
pub fn age_in_days(modified: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    let seconds = (now - modified).num_seconds();
    if seconds <= 0 {
        return 0;
    }
    u32::try_from(seconds / SECONDS_PER_DAY).unwrap_or(u32::MAX)
}

/// Converts a file timestamp, returning `None` when chrono cannot represent it.
pub fn system_time_to_utc(time: SystemTime) -> Option<DateTime<Utc>> {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => {
            let secs = i64::try_from(after.as_secs()).ok()?;
            DateTime::from_timestamp(secs, after.subsec_nanos())
        }
        Err(e) => {
            let before = e.duration();
            let secs = i64::try_from(before.as_secs()).ok()?;
            let whole = DateTime::from_timestamp(-secs, 0)?;
            whole.checked_sub_signed(chrono::TimeDelta::nanoseconds(i64::from(
                before.subsec_nanos(),
            )))
        }
    }
}

/// Something that can produce a snapshot of the watched directory.
pub trait SnapshotSource: Send + Sync {
    /// Enumerate the current items, computing ages relative to `now`.
    fn read(&self, now: DateTime<Utc>) -> DeskResult<Vec<Item>>;

    /// Directory the items live in, used as the default parent for new folders.
    fn root(&self) -> &Path;
}

/// Reads regular files directly inside a directory on disk.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
    excludes: CompiledExcludes,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            excludes: CompiledExcludes::default(),
        }
    }

    pub fn with_excludes(mut self, excludes: CompiledExcludes) -> Self {
        self.excludes = excludes;
        self
    }

    fn read_entry(entry: &fs::DirEntry, now: DateTime<Utc>) -> DeskResult<Option<Item>> {
        let path = entry.path();
        let per_entry = |source| DeskError::PerEntryReadFailure {
            path: path.clone(),
            source,
        };

        // DirEntry::file_type does not follow symlinks.
        let file_type = entry.file_type().map_err(per_entry)?;
        if !file_type.is_file() {
            return Ok(None);
        }

        let metadata = entry.metadata().map_err(per_entry)?;
        let modified = metadata.modified().map_err(per_entry)?;
        let modified = system_time_to_utc(modified).ok_or_else(|| {
            per_entry(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "modification time out of range",
            ))
        })?;

        Ok(Some(Item::new(path.clone(), modified, metadata.len(), now)))
    }
}

impl SnapshotSource for DirectorySource {
    fn read(&self, now: DateTime<Utc>) -> DeskResult<Vec<Item>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| DeskError::DirectoryUnavailable {
            path: self.dir.clone(),
            source: e,
        })?;

        let mut items = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry in {}: {}", self.dir.display(), e);
                    continue;
                }
            };

            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            if self.excludes.is_excluded(&entry.path()) {
                debug!("Excluded by config: {}", entry.path().display());
                continue;
            }

            match Self::read_entry(&entry, now) {
                Ok(Some(item)) => items.push(item),
                Ok(None) => {}
                Err(e) => warn!("{}", e),
            }
        }

        debug!("Snapshot of {}: {} items", self.dir.display(), items.len());
        Ok(items)
    }

    fn root(&self) -> &Path {
        &self.dir
    }
}

/// One row of an in-memory fixture.
#[derive(Debug, Clone)]
pub struct FixtureEntry {
    pub path: PathBuf,
    pub modified: DateTime<Utc>,
    pub size: u64,
}

/// A fixed, in-memory snapshot source for tests and demos.
///
/// Each `read` returns new items with fresh IDs, just like a real rescan.
#[derive(Debug, Clone)]
pub struct FixtureSource {
    root: PathBuf,
    entries: Vec<FixtureEntry>,
    unavailable: bool,
}

impl FixtureSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entries: Vec::new(),
            unavailable: false,
        }
    }

    /// Adds a file named `name` under the fixture root.
    pub fn with_file(mut self, name: &str, modified: DateTime<Utc>, size: u64) -> Self {
        self.entries.push(FixtureEntry {
            path: self.root.join(name),
            modified,
            size,
        });
        self
    }

    /// Makes every read fail as if the directory were missing.
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }
}

impl SnapshotSource for FixtureSource {
    fn read(&self, now: DateTime<Utc>) -> DeskResult<Vec<Item>> {
        if self.unavailable {
            return Err(DeskError::DirectoryUnavailable {
                path: self.root.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "fixture unavailable"),
            });
        }

        Ok(self
            .entries
            .iter()
            .map(|e| Item::new(e.path.clone(), e.modified, e.size, now))
            .collect())
    }

    fn root(&self) -> &Path {
        &self.root
    }
}
