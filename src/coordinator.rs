//! Owner of the monitor's mutable state.
//!
//! The coordinator runs refresh cycles (snapshot, classify, sort, score),
//! tracks the user's selection and ignore list, drives bulk operations, and
//! publishes every new [`DesktopView`] on a `watch` channel.
//!
//! All state sits behind one mutex that is never held across an `.await`.
//! Scans run on the blocking pool and are serialized by an async gate, so two
//! scans of the same directory never overlap.

use crate::classify::{AgeThreshold, classify};
use crate::config::DeskConfig;
use crate::error::{DeskError, DeskResult};
use crate::file_operations::{BatchOutcome, BulkFileOperations};
use crate::ignore_list::IgnoreStore;
use crate::notifier::{DailyNotifyGate, Notifier};
use crate::score::ScoreModel;
use crate::snapshot::{Item, ItemId, SnapshotSource};
use crate::sort::{SortSpec, sort_items};
use chrono::{DateTime, Local, Utc};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Tunables for a coordinator.
#[derive(Debug, Clone, Copy)]
pub struct CoordinatorSettings {
    pub min_age: AgeThreshold,
    /// Days past `min_age` after which the scorer counts a file as old.
    pub stale_offset_days: u32,
    pub notify_threshold: usize,
    pub sort: SortSpec,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            min_age: AgeThreshold::default(),
            stale_offset_days: 14,
            notify_threshold: 15,
            sort: SortSpec::default(),
        }
    }
}

impl CoordinatorSettings {
    pub fn from_config(config: &DeskConfig) -> Self {
        Self {
            min_age: config.age_threshold(),
            stale_offset_days: config.stale_offset_days,
            notify_threshold: config.notify_threshold,
            sort: config.sort.into(),
        }
    }

    fn old_threshold_days(&self) -> u32 {
        self.min_age.days().saturating_add(self.stale_offset_days)
    }
}

/// Everything observers need to render the current state.
#[derive(Debug, Clone, Default)]
pub struct DesktopView {
    /// Incremented on every publication.
    pub generation: u64,
    /// When the items were scanned; `None` before the first refresh.
    pub scanned_at: Option<DateTime<Utc>>,
    pub actionable: Vec<Item>,
    pub ignored: Vec<Item>,
    /// IDs of selected actionable items.
    pub selection: BTreeSet<ItemId>,
    pub score: ScoreModel,
    pub sort: SortSpec,
    pub min_age: AgeThreshold,
}

impl DesktopView {
    pub fn selected_items(&self) -> Vec<Item> {
        self.actionable
            .iter()
            .filter(|item| self.selection.contains(&item.id))
            .cloned()
            .collect()
    }

    pub fn find_actionable(&self, file_name: &str) -> Option<&Item> {
        self.actionable
            .iter()
            .find(|item| item.file_name() == file_name)
    }
}

/// What a bulk action did, and the state afterwards.
#[derive(Debug)]
pub struct BulkReport {
    pub outcome: BatchOutcome,
    /// Target folder for move actions.
    pub folder: Option<PathBuf>,
    /// The view published after the follow-up refresh.
    pub view: Arc<DesktopView>,
    /// Set when the follow-up refresh failed; `view` is then the last good one.
    pub refresh_error: Option<DeskError>,
}

/// Result of flipping a path's ignore flag.
#[derive(Debug)]
pub struct IgnoreReport {
    /// Whether the path is ignored afterwards.
    pub ignored: bool,
    /// The view published after the follow-up refresh.
    pub view: Arc<DesktopView>,
    /// Set when the follow-up refresh failed. The new flag is saved either way.
    pub refresh_error: Option<DeskError>,
}

struct State {
    view: DesktopView,
    ignore_set: BTreeSet<String>,
    settings: CoordinatorSettings,
}

struct Inner {
    source: Arc<dyn SnapshotSource>,
    ignore_store: Arc<dyn IgnoreStore>,
    notifier: Arc<dyn Notifier>,
    operations: BulkFileOperations,
    state: Mutex<State>,
    scan_gate: tokio::sync::Mutex<()>,
    scans_started: AtomicU64,
    /// ID of the latest scan if it succeeded, zero after a failed scan.
    last_good_scan: AtomicU64,
    notify_gate: DailyNotifyGate,
    publisher: watch::Sender<Arc<DesktopView>>,
}

/// Cheaply cloneable handle to the shared monitor state.
#[derive(Clone)]
pub struct ScanCoordinator {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ScanCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanCoordinator")
            .field("root", &self.inner.source.root())
            .finish_non_exhaustive()
    }
}

impl ScanCoordinator {
    /// Creates a coordinator and loads the ignore list once.
    ///
    /// No scan happens until [`refresh`](Self::refresh) is called.
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        ignore_store: Arc<dyn IgnoreStore>,
        notifier: Arc<dyn Notifier>,
        operations: BulkFileOperations,
        settings: CoordinatorSettings,
    ) -> DeskResult<Self> {
        let ignore_set = ignore_store.load()?;
        info!(
            "Watching {} ({} ignored paths)",
            source.root().display(),
            ignore_set.len()
        );

        let view = DesktopView {
            sort: settings.sort,
            min_age: settings.min_age,
            ..Default::default()
        };
        let (publisher, _rx) = watch::channel(Arc::new(view.clone()));

        Ok(Self {
            inner: Arc::new(Inner {
                source,
                ignore_store,
                notifier,
                operations,
                state: Mutex::new(State {
                    view,
                    ignore_set,
                    settings,
                }),
                scan_gate: tokio::sync::Mutex::new(()),
                scans_started: AtomicU64::new(0),
                last_good_scan: AtomicU64::new(0),
                notify_gate: DailyNotifyGate::default(),
                publisher,
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Publishes the current view; call with the state lock held.
    fn publish(&self, state: &mut State) -> Arc<DesktopView> {
        state.view.generation += 1;
        let view = Arc::new(state.view.clone());
        self.inner.publisher.send_replace(Arc::clone(&view));
        view
    }

    /// The most recently published view.
    pub fn view(&self) -> Arc<DesktopView> {
        Arc::clone(&self.inner.publisher.borrow())
    }

    /// Receives every view published from now on.
    pub fn subscribe(&self) -> watch::Receiver<Arc<DesktopView>> {
        self.inner.publisher.subscribe()
    }

    pub fn root(&self) -> &Path {
        self.inner.source.root()
    }

    /// Rescans the directory and republishes state.
    ///
    /// A request made while another scan is running waits for it. If a scan
    /// that started after this request has already finished successfully, and
    /// no scan has failed since, that scan's view is returned instead of
    /// scanning again.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryUnavailable` when the directory cannot be read; the
    /// published state is left untouched in that case.
    pub async fn refresh(&self) -> DeskResult<Arc<DesktopView>> {
        let requested_at = self.inner.scans_started.load(Ordering::SeqCst);
        let _gate = self.inner.scan_gate.lock().await;

        if self.inner.last_good_scan.load(Ordering::SeqCst) > requested_at {
            debug!("Refresh coalesced with a newer scan");
            return Ok(self.view());
        }
        let scan_id = self.inner.scans_started.fetch_add(1, Ordering::SeqCst) + 1;

        let source = Arc::clone(&self.inner.source);
        let now = Utc::now();
        let items = match run_blocking(move || source.read(now)).await.and_then(|r| r) {
            Ok(items) => items,
            Err(e) => {
                self.inner.last_good_scan.store(0, Ordering::SeqCst);
                return Err(e);
            }
        };
        self.inner.last_good_scan.store(scan_id, Ordering::SeqCst);

        let view = self.apply_snapshot(items, now);
        info!(
            "Refreshed {}: {} actionable, {} ignored, score {} ({})",
            self.root().display(),
            view.actionable.len(),
            view.ignored.len(),
            view.score.score,
            view.score.level.label()
        );
        self.maybe_notify(&view);
        Ok(view)
    }

    fn apply_snapshot(&self, items: Vec<Item>, now: DateTime<Utc>) -> Arc<DesktopView> {
        let mut state = self.lock();
        let settings = state.settings;

        let mut classification = classify(items, settings.min_age, &state.ignore_set);
        sort_items(&mut classification.actionable, settings.sort);
        sort_items(&mut classification.ignored, settings.sort);
        let score = ScoreModel::from_items(
            &classification.actionable,
            settings.old_threshold_days(),
        );

        state.view.scanned_at = Some(now);
        state.view.actionable = classification.actionable;
        state.view.ignored = classification.ignored;
        state.view.selection.clear();
        state.view.score = score;
        state.view.sort = settings.sort;
        state.view.min_age = settings.min_age;
        self.publish(&mut state)
    }

    fn maybe_notify(&self, view: &DesktopView) {
        let threshold = self.lock().settings.notify_threshold;
        let count = view.actionable.len();
        if count > threshold && self.inner.notify_gate.try_pass(Local::now().date_naive()) {
            info!("Notifying: {} actionable files exceed {}", count, threshold);
            self.inner.notifier.notify_too_many_files(count, threshold);
        }
    }

    /// Re-sorts both lists without rescanning.
    pub fn set_sort(&self, sort: SortSpec) -> Arc<DesktopView> {
        let mut state = self.lock();
        state.settings.sort = sort;
        state.view.sort = sort;
        sort_items(&mut state.view.actionable, sort);
        sort_items(&mut state.view.ignored, sort);
        self.publish(&mut state)
    }

    /// Changes the age filter (clamped) and refreshes.
    pub async fn set_min_age_days(&self, days: u32) -> DeskResult<Arc<DesktopView>> {
        let threshold = AgeThreshold::new(days);
        {
            let mut state = self.lock();
            state.settings.min_age = threshold;
        }
        debug!("Age filter set to {} days", threshold.days());
        self.refresh().await
    }

    /// Selects or deselects an actionable item. Unknown IDs are ignored.
    ///
    /// Returns whether the item is selected afterwards.
    pub fn toggle_selection(&self, id: ItemId) -> bool {
        let mut state = self.lock();
        if !state.view.actionable.iter().any(|item| item.id == id) {
            return false;
        }
        let selected = if state.view.selection.remove(&id) {
            false
        } else {
            state.view.selection.insert(id);
            true
        };
        self.publish(&mut state);
        selected
    }

    /// Adds an actionable item to the selection; selecting twice is a no-op.
    ///
    /// Returns false for IDs that are not in the actionable list.
    pub fn select(&self, id: ItemId) -> bool {
        let mut state = self.lock();
        if !state.view.actionable.iter().any(|item| item.id == id) {
            return false;
        }
        if state.view.selection.insert(id) {
            self.publish(&mut state);
        }
        true
    }

    pub fn select_all(&self) -> Arc<DesktopView> {
        let mut state = self.lock();
        state.view.selection = state.view.actionable.iter().map(|item| item.id).collect();
        self.publish(&mut state)
    }

    pub fn clear_selection(&self) -> Arc<DesktopView> {
        let mut state = self.lock();
        state.view.selection.clear();
        self.publish(&mut state)
    }

    /// Selected items, filtered against the live actionable list.
    pub fn selected_items(&self) -> Vec<Item> {
        self.lock().view.selected_items()
    }

    pub fn is_ignored(&self, path: &str) -> bool {
        self.lock().ignore_set.contains(path)
    }

    pub fn ignored_paths(&self) -> BTreeSet<String> {
        self.lock().ignore_set.clone()
    }

    /// Flips the ignore flag for `path`, persists the list, then refreshes.
    ///
    /// If saving fails the in-memory list is restored, nothing is refreshed
    /// and the save error is returned. A failed refresh after a successful
    /// save is reported in [`IgnoreReport::refresh_error`].
    pub async fn toggle_ignore(&self, path: &str) -> DeskResult<IgnoreReport> {
        let (ignored, snapshot) = {
            let mut state = self.lock();
            let ignored = if state.ignore_set.remove(path) {
                false
            } else {
                state.ignore_set.insert(path.to_string());
                true
            };
            (ignored, state.ignore_set.clone())
        };

        if let Err(e) = self.inner.ignore_store.save(&snapshot) {
            let mut state = self.lock();
            if ignored {
                state.ignore_set.remove(path);
            } else {
                state.ignore_set.insert(path.to_string());
            }
            return Err(e);
        }

        info!(
            "{} {}",
            if ignored { "Ignoring" } else { "No longer ignoring" },
            path
        );
        let (view, refresh_error) = self.refresh_after_change("ignore toggle").await;
        Ok(IgnoreReport {
            ignored,
            view,
            refresh_error,
        })
    }

    /// Moves the selected items to the trash, then refreshes.
    pub async fn trash_selected(&self) -> DeskResult<BulkReport> {
        let items = self.selected_items();
        let operations = self.inner.operations.clone();
        let outcome = run_blocking(move || operations.move_to_trash(&items)).await?;
        Ok(self.finish_bulk(outcome, None).await)
    }

    /// Moves the selected items into `destination_dir`, then refreshes.
    pub async fn move_selected_to(&self, destination_dir: PathBuf) -> DeskResult<BulkReport> {
        let items = self.selected_items();
        let operations = self.inner.operations.clone();
        let target = destination_dir.clone();
        let outcome = run_blocking(move || operations.move_to_folder(&items, &target)).await?;
        Ok(self.finish_bulk(outcome, Some(destination_dir)).await)
    }

    /// Creates `parent/folder_name` (parent defaults to the watched directory)
    /// and moves the selected items into it, then refreshes.
    ///
    /// # Errors
    ///
    /// Returns `FolderCreationFailure` without moving anything or refreshing
    /// when the folder cannot be created.
    pub async fn create_folder_and_move_selected(
        &self,
        folder_name: String,
        parent: Option<PathBuf>,
    ) -> DeskResult<BulkReport> {
        let items = self.selected_items();
        let operations = self.inner.operations.clone();
        let parent = parent.unwrap_or_else(|| self.root().to_path_buf());
        let result = run_blocking(move || {
            operations.create_folder_and_move(&folder_name, &parent, &items)
        })
        .await??;
        Ok(self.finish_bulk(result.batch, Some(result.folder)).await)
    }

    async fn finish_bulk(&self, outcome: BatchOutcome, folder: Option<PathBuf>) -> BulkReport {
        let (view, refresh_error) = self.refresh_after_change("bulk operation").await;
        BulkReport {
            outcome,
            folder,
            view,
            refresh_error,
        }
    }

    /// Refreshes after a mutation, falling back to the last good view.
    async fn refresh_after_change(&self, what: &str) -> (Arc<DesktopView>, Option<DeskError>) {
        match self.refresh().await {
            Ok(view) => (view, None),
            Err(e) => {
                warn!("Refresh after {} failed: {}", what, e);
                (self.view(), Some(e))
            }
        }
    }

    /// Refreshes every `period` until the returned handle is aborted.
    pub fn spawn_periodic_refresh(&self, period: Duration) -> JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                if let Err(e) = coordinator.refresh().await {
                    warn!("Periodic refresh failed: {}", e);
                }
            }
        })
    }
}

async fn run_blocking<T, F>(f: F) -> DeskResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| DeskError::Task(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_operations::TrashBin;
    use crate::ignore_list::MemoryIgnoreStore;
    use crate::notifier::SilentNotifier;
    use crate::score::Level;
    use crate::snapshot::FixtureSource;
    use crate::sort::{SortDirection, SortKey};
    use chrono::Duration as ChronoDuration;
    use std::sync::atomic::AtomicUsize;

    struct NoTrash;

    impl TrashBin for NoTrash {
        fn trash(&self, _path: &Path) -> Result<(), String> {
            Err("trash disabled in tests".to_string())
        }
    }

    #[derive(Default)]
    struct CountingNotifier {
        calls: AtomicUsize,
    }

    impl Notifier for CountingNotifier {
        fn notify_too_many_files(&self, _count: usize, _threshold: usize) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn coordinator_for(source: FixtureSource, settings: CoordinatorSettings) -> ScanCoordinator {
        ScanCoordinator::new(
            Arc::new(source),
            Arc::new(MemoryIgnoreStore::default()),
            Arc::new(SilentNotifier),
            BulkFileOperations::new(Arc::new(NoTrash)),
            settings,
        )
        .unwrap()
    }

    fn fixture(ages: &[i64]) -> FixtureSource {
        let now = Utc::now();
        ages.iter()
            .enumerate()
            .fold(FixtureSource::new("/desk"), |source, (i, age)| {
                source.with_file(
                    &format!("file{i:02}.txt"),
                    now - ChronoDuration::days(*age),
                    (i as u64 + 1) * 10,
                )
            })
    }

    #[tokio::test]
    async fn test_young_desktop_is_clean() {
        let coordinator = coordinator_for(fixture(&[1; 20]), CoordinatorSettings::default());
        let view = coordinator.refresh().await.unwrap();

        assert!(view.actionable.is_empty());
        assert_eq!(view.score.score, 100);
        assert_eq!(view.score.level, Level::Good);
    }

    #[tokio::test]
    async fn test_stale_desktop_is_bad() {
        let coordinator = coordinator_for(fixture(&[95; 10]), CoordinatorSettings::default());
        let view = coordinator.refresh().await.unwrap();

        assert_eq!(view.actionable.len(), 10);
        assert_eq!(view.score.old_file_count, 10);
        assert_eq!(view.score.level, Level::Bad);
    }

    #[tokio::test]
    async fn test_refresh_clears_selection() {
        let coordinator = coordinator_for(fixture(&[30, 40]), CoordinatorSettings::default());
        coordinator.refresh().await.unwrap();
        coordinator.select_all();
        assert_eq!(coordinator.selected_items().len(), 2);

        let view = coordinator.refresh().await.unwrap();
        assert!(view.selection.is_empty());
        assert!(coordinator.selected_items().is_empty());
    }

    #[tokio::test]
    async fn test_toggle_selection_only_accepts_actionable_ids() {
        let coordinator = coordinator_for(fixture(&[1, 30]), CoordinatorSettings::default());
        let first = coordinator.refresh().await.unwrap();
        let id = first.actionable[0].id;

        assert!(coordinator.toggle_selection(id));
        assert!(!coordinator.toggle_selection(id));

        // IDs from an earlier snapshot are stale after a rescan.
        coordinator.refresh().await.unwrap();
        assert!(!coordinator.toggle_selection(id));
        assert!(coordinator.view().selection.is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_directory_keeps_state() {
        let coordinator =
            coordinator_for(fixture(&[30]).unavailable(), CoordinatorSettings::default());
        let before = coordinator.view();

        let result = coordinator.refresh().await;

        assert!(matches!(result, Err(DeskError::DirectoryUnavailable { .. })));
        assert_eq!(coordinator.view().generation, before.generation);
    }

    #[tokio::test]
    async fn test_set_sort_resorts_both_lists() {
        let coordinator = coordinator_for(fixture(&[10, 20, 30]), CoordinatorSettings::default());
        coordinator.refresh().await.unwrap();

        let view = coordinator.set_sort(SortSpec::new(SortKey::Size, SortDirection::Descending));

        let sizes: Vec<u64> = view.actionable.iter().map(|item| item.size).collect();
        assert_eq!(sizes, vec![30, 20, 10]);
        assert_eq!(view.sort.key, SortKey::Size);
    }

    #[tokio::test]
    async fn test_set_min_age_days_clamps_and_reclassifies() {
        let coordinator = coordinator_for(fixture(&[3, 10]), CoordinatorSettings::default());
        assert_eq!(coordinator.refresh().await.unwrap().actionable.len(), 1);

        let view = coordinator.set_min_age_days(0).await.unwrap();
        assert_eq!(view.min_age.days(), 1);
        assert_eq!(view.actionable.len(), 2);
    }

    #[tokio::test]
    async fn test_toggle_ignore_moves_item_and_persists() {
        let store = Arc::new(MemoryIgnoreStore::default());
        let coordinator = ScanCoordinator::new(
            Arc::new(fixture(&[30, 40])),
            store.clone(),
            Arc::new(SilentNotifier),
            BulkFileOperations::new(Arc::new(NoTrash)),
            CoordinatorSettings::default(),
        )
        .unwrap();
        coordinator.refresh().await.unwrap();

        let report = coordinator.toggle_ignore("/desk/file00.txt").await.unwrap();
        assert!(report.ignored);
        assert!(report.refresh_error.is_none());
        assert_eq!(report.view.actionable.len(), 1);
        assert_eq!(report.view.ignored.len(), 1);
        assert!(store.load().unwrap().contains("/desk/file00.txt"));
        assert_eq!(
            coordinator.ignored_paths(),
            BTreeSet::from(["/desk/file00.txt".to_string()])
        );

        let report = coordinator.toggle_ignore("/desk/file00.txt").await.unwrap();
        assert!(!report.ignored);
        assert_eq!(coordinator.view().actionable.len(), 2);
        assert!(store.load().unwrap().is_empty());
        assert!(coordinator.ignored_paths().is_empty());
    }

    #[tokio::test]
    async fn test_toggle_ignore_is_kept_when_rescan_fails() {
        let store = Arc::new(MemoryIgnoreStore::default());
        let coordinator = ScanCoordinator::new(
            Arc::new(fixture(&[30]).unavailable()),
            store.clone(),
            Arc::new(SilentNotifier),
            BulkFileOperations::new(Arc::new(NoTrash)),
            CoordinatorSettings::default(),
        )
        .unwrap();

        let report = coordinator.toggle_ignore("/desk/file00.txt").await.unwrap();

        assert!(report.ignored);
        assert!(matches!(
            report.refresh_error,
            Some(DeskError::DirectoryUnavailable { .. })
        ));
        assert!(coordinator.is_ignored("/desk/file00.txt"));
        assert!(store.load().unwrap().contains("/desk/file00.txt"));
    }

    #[tokio::test]
    async fn test_select_is_idempotent() {
        let coordinator = coordinator_for(fixture(&[30, 40]), CoordinatorSettings::default());
        let view = coordinator.refresh().await.unwrap();
        let id = view.actionable[0].id;

        assert!(coordinator.select(id));
        assert!(coordinator.select(id));
        assert_eq!(coordinator.selected_items().len(), 1);

        coordinator.refresh().await.unwrap();
        assert!(!coordinator.select(id));
    }

    #[tokio::test]
    async fn test_clear_selection() {
        let coordinator = coordinator_for(fixture(&[30, 40]), CoordinatorSettings::default());
        coordinator.refresh().await.unwrap();
        coordinator.select_all();
        assert_eq!(coordinator.selected_items().len(), 2);

        let view = coordinator.clear_selection();

        assert!(view.selection.is_empty());
        assert_eq!(view.actionable.len(), 2);
        assert!(coordinator.selected_items().is_empty());
    }

    #[tokio::test]
    async fn test_notifies_once_per_day() {
        let notifier = Arc::new(CountingNotifier::default());
        let coordinator = ScanCoordinator::new(
            Arc::new(fixture(&[30; 16])),
            Arc::new(MemoryIgnoreStore::default()),
            notifier.clone(),
            BulkFileOperations::new(Arc::new(NoTrash)),
            CoordinatorSettings::default(),
        )
        .unwrap();

        coordinator.refresh().await.unwrap();
        coordinator.refresh().await.unwrap();

        assert_eq!(notifier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_notification_at_threshold() {
        let notifier = Arc::new(CountingNotifier::default());
        let coordinator = ScanCoordinator::new(
            Arc::new(fixture(&[30; 15])),
            Arc::new(MemoryIgnoreStore::default()),
            notifier.clone(),
            BulkFileOperations::new(Arc::new(NoTrash)),
            CoordinatorSettings::default(),
        )
        .unwrap();

        coordinator.refresh().await.unwrap();
        assert_eq!(notifier.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_trash_still_refreshes() {
        let coordinator = coordinator_for(fixture(&[30]), CoordinatorSettings::default());
        let before = coordinator.refresh().await.unwrap();
        coordinator.select_all();

        let report = coordinator.trash_selected().await.unwrap();

        assert_eq!(report.outcome.processed, 0);
        assert!(matches!(report.outcome.error, Some(DeskError::TrashFailure { .. })));
        assert!(report.view.generation > before.generation);
        assert!(report.view.selection.is_empty());
    }

    #[tokio::test]
    async fn test_subscribers_see_new_views() {
        let coordinator = coordinator_for(fixture(&[30]), CoordinatorSettings::default());
        let mut rx = coordinator.subscribe();

        coordinator.refresh().await.unwrap();

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().actionable.len(), 1);
    }

    /// Source that records how many reads overlap. Reads after the first
    /// fail when `fail_after_first` is set.
    struct SlowSource {
        root: PathBuf,
        delay: std::time::Duration,
        fail_after_first: bool,
        active: AtomicUsize,
        max_active: AtomicUsize,
        reads: AtomicUsize,
    }

    impl SlowSource {
        fn new(delay_ms: u64, fail_after_first: bool) -> Self {
            Self {
                root: PathBuf::from("/desk"),
                delay: std::time::Duration::from_millis(delay_ms),
                fail_after_first,
                active: AtomicUsize::new(0),
                max_active: AtomicUsize::new(0),
                reads: AtomicUsize::new(0),
            }
        }

        async fn wait_until_reading(&self) {
            while self.active.load(Ordering::SeqCst) == 0 {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
        }
    }

    impl SnapshotSource for SlowSource {
        fn read(&self, _now: DateTime<Utc>) -> DeskResult<Vec<Item>> {
            let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(active, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            self.active.fetch_sub(1, Ordering::SeqCst);
            let previous = self.reads.fetch_add(1, Ordering::SeqCst);
            if self.fail_after_first && previous > 0 {
                return Err(DeskError::DirectoryUnavailable {
                    path: self.root.clone(),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                });
            }
            Ok(Vec::new())
        }

        fn root(&self) -> &Path {
            &self.root
        }
    }

    fn slow_coordinator(source: Arc<SlowSource>) -> ScanCoordinator {
        ScanCoordinator::new(
            source,
            Arc::new(MemoryIgnoreStore::default()),
            Arc::new(SilentNotifier),
            BulkFileOperations::new(Arc::new(NoTrash)),
            CoordinatorSettings::default(),
        )
        .unwrap()
    }

    fn spawn_refresh(coordinator: &ScanCoordinator) -> JoinHandle<DeskResult<Arc<DesktopView>>> {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.refresh().await })
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_refreshes_never_overlap() {
        let source = Arc::new(SlowSource::new(200, false));
        let coordinator = slow_coordinator(source.clone());

        let first = spawn_refresh(&coordinator);
        source.wait_until_reading().await;
        let waiting: Vec<_> = (0..5).map(|_| spawn_refresh(&coordinator)).collect();

        first.await.unwrap().unwrap();
        for handle in waiting {
            handle.await.unwrap().unwrap();
        }

        // Requests queued behind the first scan share one follow-up scan.
        let reads = source.reads.load(Ordering::SeqCst);
        assert_eq!(source.max_active.load(Ordering::SeqCst), 1);
        assert!(reads >= 2, "queued requests still need a fresh scan");
        assert!(reads < 6, "queued requests were not coalesced: {reads} reads");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_queued_refresh_does_not_coalesce_onto_failed_scan() {
        let source = Arc::new(SlowSource::new(100, true));
        let coordinator = slow_coordinator(source.clone());

        let first = spawn_refresh(&coordinator);
        source.wait_until_reading().await;
        let second = spawn_refresh(&coordinator);
        let third = spawn_refresh(&coordinator);

        assert!(first.await.unwrap().is_ok());
        let second = second.await.unwrap();
        let third = third.await.unwrap();

        assert!(matches!(second, Err(DeskError::DirectoryUnavailable { .. })));
        assert!(matches!(third, Err(DeskError::DirectoryUnavailable { .. })));
        assert_eq!(source.reads.load(Ordering::SeqCst), 3);
    }
}
