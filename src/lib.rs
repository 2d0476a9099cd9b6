//! deskclean - keep a watched desktop directory tidy
//!
//! This library scans a single directory, classifies its files by age and
//! ignore status, scores how cluttered it is, and performs bulk trash and
//! move operations on a selection of cleanup candidates. The
//! [`ScanCoordinator`] owns all mutable state and publishes every change.

pub mod classify;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod file_operations;
pub mod ignore_list;
pub mod logging;
pub mod notifier;
pub mod output;
pub mod score;
pub mod snapshot;
pub mod sort;

pub use classify::{AgeThreshold, Classification, classify};
pub use config::{ConfigError, DeskConfig};
pub use coordinator::{
    BulkReport, CoordinatorSettings, DesktopView, IgnoreReport, ScanCoordinator,
};
pub use error::{DeskError, DeskResult};
pub use file_operations::{BatchOutcome, BulkFileOperations, SystemTrash, TrashBin};
pub use ignore_list::{IgnoreStore, JsonIgnoreStore, MemoryIgnoreStore};
pub use notifier::{LogNotifier, Notifier};
pub use score::{Level, ScoreModel};
pub use snapshot::{DirectorySource, FixtureSource, Item, ItemId, SnapshotSource};
pub use sort::{SortDirection, SortKey, SortSpec, sort_items};
