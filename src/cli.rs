//! Command-line interface for deskclean.
//!
//! A thin layer over [`ScanCoordinator`]: it loads configuration, builds the
//! coordinator with its collaborators, and maps each subcommand to one
//! coordinator operation.

use crate::config::DeskConfig;
use crate::coordinator::{BulkReport, CoordinatorSettings, DesktopView, ScanCoordinator};
use crate::error::{DeskError, DeskResult};
use crate::file_operations::BulkFileOperations;
use crate::ignore_list::{IgnoreStore, JsonIgnoreStore, MemoryIgnoreStore};
use crate::notifier::LogNotifier;
use crate::output::OutputFormatter;
use crate::snapshot::DirectorySource;
use crate::sort::SortSpec;
use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "deskclean", version, about = "Keep your desktop tidy")]
pub struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory to watch instead of the configured one.
    #[arg(long, global = true)]
    pub dir: Option<PathBuf>,

    /// Minimum age in days for a file to be suggested (clamped to 1-2000).
    #[arg(long, global = true)]
    pub min_age: Option<u32>,

    /// Sort order as `key[:asc|desc]`; keys are name, date, age, size, type.
    #[arg(long, global = true)]
    pub sort: Option<SortSpec>,

    /// Keep ignore-list changes in memory only.
    #[arg(long, global = true)]
    pub no_persist: bool,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Scan once and print the score and cleanup candidates.
    Status,
    /// Move the named cleanup candidates to the trash.
    Trash {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Move the named cleanup candidates into a folder.
    Move {
        #[arg(required = true)]
        names: Vec<String>,
        /// Destination directory.
        #[arg(long)]
        to: PathBuf,
    },
    /// Create a folder in the watched directory and move the named candidates into it.
    Folder {
        /// Name of the folder to create.
        name: String,
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Toggle whether a file is ignored.
    Ignore {
        /// File name inside the watched directory, or an absolute path.
        path: PathBuf,
    },
    /// Rescan periodically until interrupted.
    Watch {
        /// Seconds between scans.
        #[arg(long, default_value_t = 300)]
        interval: u64,
    },
}

/// Applies command-line overrides on top of the loaded configuration.
pub fn resolve_config(cli: &Cli) -> DeskResult<DeskConfig> {
    let mut config = DeskConfig::load(cli.config.as_deref())?;
    if let Some(dir) = &cli.dir {
        config.watched_dir = dir.clone();
    }
    if let Some(days) = cli.min_age {
        config.min_age_days = days;
    }
    if let Some(sort) = cli.sort {
        config.sort.key = sort.key;
        config.sort.direction = sort.direction;
    }
    Ok(config)
}

/// Wires a coordinator to the real filesystem, trash and ignore list.
pub fn build_coordinator(
    config: &DeskConfig,
    persist_ignores: bool,
) -> DeskResult<ScanCoordinator> {
    let source =
        DirectorySource::new(&config.watched_dir).with_excludes(config.compile_excludes()?);
    let store: Arc<dyn IgnoreStore> = if persist_ignores {
        Arc::new(JsonIgnoreStore::new(&config.ignore_list_path))
    } else {
        Arc::new(MemoryIgnoreStore::with_paths(
            JsonIgnoreStore::new(&config.ignore_list_path).load()?,
        ))
    };

    ScanCoordinator::new(
        Arc::new(source),
        store,
        Arc::new(LogNotifier),
        BulkFileOperations::default(),
        CoordinatorSettings::from_config(config),
    )
}

/// Runs the CLI application.
pub async fn run(cli: Cli) -> DeskResult<()> {
    let config = resolve_config(&cli)?;
    info!("Using watched directory {}", config.watched_dir.display());
    let coordinator = build_coordinator(&config, !cli.no_persist)?;

    match cli.command.unwrap_or(Command::Status) {
        Command::Status => {
            let view = scan(&coordinator).await?;
            OutputFormatter::print_view(&view);
        }
        Command::Trash { names } => {
            select_by_name(&coordinator, &names).await?;
            let report = coordinator.trash_selected().await?;
            report_bulk("Trashed", &report);
        }
        Command::Move { names, to } => {
            select_by_name(&coordinator, &names).await?;
            let report = coordinator.move_selected_to(to).await?;
            report_bulk("Moved", &report);
        }
        Command::Folder { name, names } => {
            select_by_name(&coordinator, &names).await?;
            let report = coordinator.create_folder_and_move_selected(name, None).await?;
            report_bulk("Moved", &report);
        }
        Command::Ignore { path } => {
            scan(&coordinator).await?;
            let key = resolve_path(coordinator.root(), &path);
            let report = coordinator.toggle_ignore(&key).await?;
            if report.ignored {
                OutputFormatter::success(&format!("Ignoring {}", key));
            } else {
                OutputFormatter::success(&format!("No longer ignoring {}", key));
            }
            if let Some(e) = &report.refresh_error {
                OutputFormatter::warning(&format!("Could not rescan afterwards: {}", e));
            }
        }
        Command::Watch { interval } => watch(&coordinator, interval).await?,
    }

    Ok(())
}

async fn scan(coordinator: &ScanCoordinator) -> DeskResult<Arc<DesktopView>> {
    let spinner =
        OutputFormatter::scan_spinner(&format!("Scanning {}", coordinator.root().display()));
    let result = coordinator.refresh().await;
    spinner.finish_and_clear();
    result
}

/// Scans, then selects the actionable items with the given file names.
///
/// Naming a file more than once selects it once.
async fn select_by_name(coordinator: &ScanCoordinator, names: &[String]) -> DeskResult<()> {
    let view = scan(coordinator).await?;
    for name in names {
        let item = view
            .find_actionable(name)
            .ok_or_else(|| DeskError::UnknownItem { name: name.clone() })?;
        coordinator.select(item.id);
    }
    Ok(())
}

fn resolve_path(root: &Path, path: &Path) -> String {
    if path.is_absolute() {
        path.to_string_lossy().into_owned()
    } else {
        root.join(path).to_string_lossy().into_owned()
    }
}

fn report_bulk(action: &str, report: &BulkReport) {
    OutputFormatter::batch_summary(action, &report.outcome);
    if let Some(folder) = &report.folder {
        OutputFormatter::info(&format!("Destination: {}", folder.display()));
    }
    if let Some(e) = &report.refresh_error {
        OutputFormatter::warning(&format!("Could not rescan afterwards: {}", e));
    }
    println!("{}", OutputFormatter::score_line(&report.view.score));
}

async fn watch(coordinator: &ScanCoordinator, interval: u64) -> DeskResult<()> {
    OutputFormatter::info(&format!(
        "Watching {} every {}s (Ctrl-C to stop)",
        coordinator.root().display(),
        interval
    ));

    let mut updates = coordinator.subscribe();
    let ticker = coordinator.spawn_periodic_refresh(Duration::from_secs(interval.max(1)));
    let mut last_line = String::new();

    loop {
        let changed = tokio::select! {
            changed = updates.changed() => changed.is_ok(),
            _ = tokio::signal::ctrl_c() => false,
        };
        if !changed {
            break;
        }

        let line = OutputFormatter::score_line(&updates.borrow_and_update().score);
        if line != last_line {
            println!("{}", line);
            last_line = line;
        }
    }

    ticker.abort();
    Ok(())
}
