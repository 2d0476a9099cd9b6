/// Bulk file operations on the watched directory.
///
/// Each batch processes its items one at a time, in order. The first failure
/// stops the batch; the outcome reports how many items were handled before it
/// together with the error. Nothing is rolled back.
use crate::error::{DeskError, DeskResult};
use crate::snapshot::Item;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Platform trash / recycle bin.
pub trait TrashBin: Send + Sync {
    fn trash(&self, path: &Path) -> Result<(), String>;
}

/// The operating system's trash, via the `trash` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTrash;

impl TrashBin for SystemTrash {
    fn trash(&self, path: &Path) -> Result<(), String> {
        trash::delete(path).map_err(|e| e.to_string())
    }
}

/// Result of a batch that may stop part-way.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Items handled successfully before the batch stopped.
    pub processed: usize,
    /// Where each processed item ended up (empty for trash).
    pub destinations: Vec<PathBuf>,
    /// The failure that stopped the batch, if any.
    pub error: Option<DeskError>,
}

impl BatchOutcome {
    pub fn is_complete_success(&self) -> bool {
        self.error.is_none()
    }

    fn record(&mut self, destination: Option<PathBuf>) {
        self.processed += 1;
        if let Some(destination) = destination {
            self.destinations.push(destination);
        }
    }

    fn fail(mut self, error: DeskError) -> Self {
        warn!("Batch stopped after {} items: {}", self.processed, error);
        self.error = Some(error);
        self
    }
}

/// Outcome of [`BulkFileOperations::create_folder_and_move`].
#[derive(Debug)]
pub struct FolderMoveOutcome {
    /// The folder the items were moved into.
    pub folder: PathBuf,
    pub batch: BatchOutcome,
}

/// Trash, move and create-folder-and-move for a set of items.
#[derive(Clone)]
pub struct BulkFileOperations {
    trash_bin: Arc<dyn TrashBin>,
}

impl Default for BulkFileOperations {
    fn default() -> Self {
        Self::new(Arc::new(SystemTrash))
    }
}

impl BulkFileOperations {
    pub fn new(trash_bin: Arc<dyn TrashBin>) -> Self {
        Self { trash_bin }
    }

    /// Moves every item to the trash, stopping on the first failure.
    pub fn move_to_trash(&self, items: &[Item]) -> BatchOutcome {
        info!("Moving {} items to trash", items.len());
        let mut outcome = BatchOutcome::default();

        for item in items {
            if let Err(reason) = self.trash_bin.trash(&item.path) {
                return outcome.fail(DeskError::TrashFailure {
                    path: item.path.clone(),
                    reason,
                });
            }
            debug!("Trashed {}", item.path.display());
            outcome.record(None);
        }

        outcome
    }

    /// Moves every item into `destination_dir`, renaming on name collisions.
    ///
    /// A file that already lives in `destination_dir` is left where it is and
    /// counted as processed.
    pub fn move_to_folder(&self, items: &[Item], destination_dir: &Path) -> BatchOutcome {
        info!(
            "Moving {} items to {}",
            items.len(),
            destination_dir.display()
        );
        let mut outcome = BatchOutcome::default();

        for item in items {
            match move_into(&item.path, destination_dir) {
                Ok(destination) => {
                    debug!("Moved {} to {}", item.path.display(), destination.display());
                    outcome.record(Some(destination));
                }
                Err(e) => return outcome.fail(e),
            }
        }

        outcome
    }

    /// Creates `parent_dir/folder_name` if needed, then moves the items into it.
    ///
    /// # Errors
    ///
    /// Returns `FolderCreationFailure` when the name is not a single path
    /// component, when something other than a directory already occupies the
    /// path, or when the directory cannot be created. No item is moved then.
    pub fn create_folder_and_move(
        &self,
        folder_name: &str,
        parent_dir: &Path,
        items: &[Item],
    ) -> DeskResult<FolderMoveOutcome> {
        let folder = create_folder(folder_name, parent_dir)?;
        let batch = self.move_to_folder(items, &folder);
        Ok(FolderMoveOutcome { folder, batch })
    }
}

fn create_folder(folder_name: &str, parent_dir: &Path) -> DeskResult<PathBuf> {
    let trimmed = folder_name.trim();
    let folder = parent_dir.join(trimmed);

    let mut components = Path::new(trimmed).components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(std::path::Component::Normal(_)), None)
    );
    if !single_normal {
        return Err(DeskError::FolderCreationFailure {
            path: folder,
            reason: format!("'{}' is not a valid folder name", folder_name),
        });
    }

    match fs::metadata(&folder) {
        Ok(metadata) if metadata.is_dir() => {
            debug!("Using existing folder {}", folder.display());
            Ok(folder)
        }
        Ok(_) => Err(DeskError::FolderCreationFailure {
            path: folder,
            reason: "a file with that name already exists".to_string(),
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            fs::create_dir(&folder).map_err(|e| DeskError::FolderCreationFailure {
                path: folder.clone(),
                reason: e.to_string(),
            })?;
            info!("Created folder {}", folder.display());
            Ok(folder)
        }
        Err(e) => Err(DeskError::FolderCreationFailure {
            path: folder,
            reason: e.to_string(),
        }),
    }
}

/// Finds a free path for `file_name` inside `dir`.
///
/// `a.txt` becomes `a 1.txt`, `a 2.txt`, … until a name is unused; files
/// without an extension get a plain ` N` suffix.
pub fn unique_destination(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !exists(&candidate) {
        return candidate;
    }

    let as_path = Path::new(file_name);
    let stem = as_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string());
    let extension = as_path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()));

    let mut counter: u64 = 1;
    loop {
        let name = format!("{} {}{}", stem, counter, extension.as_deref().unwrap_or(""));
        let candidate = dir.join(name);
        if !exists(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

// Broken symlinks still occupy the name.
fn exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

fn move_into(source: &Path, destination_dir: &Path) -> DeskResult<PathBuf> {
    let file_name = source
        .file_name()
        .ok_or_else(|| DeskError::MoveFailure {
            source_path: source.to_path_buf(),
            destination: destination_dir.to_path_buf(),
            source: std::io::Error::new(ErrorKind::InvalidInput, "file has no name component"),
        })?
        .to_string_lossy()
        .into_owned();

    if source.parent() == Some(destination_dir) {
        return Ok(source.to_path_buf());
    }

    let destination = unique_destination(destination_dir, &file_name);
    rename_or_copy(source, &destination).map_err(|e| DeskError::MoveFailure {
        source_path: source.to_path_buf(),
        destination: destination.clone(),
        source: e,
    })?;

    Ok(destination)
}

fn rename_or_copy(source: &Path, destination: &Path) -> std::io::Result<()> {
    match fs::rename(source, destination) {
        Err(e) if e.kind() == ErrorKind::CrossesDevices => {
            debug!(
                "Cross-device move, copying {} to {}",
                source.display(),
                destination.display()
            );
            fs::copy(source, destination)?;
            fs::remove_file(source)
        }
        other => other,
    }
}
