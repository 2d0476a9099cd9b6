//! Terminal output for the CLI.
//!
//! Keeps colors, spinners and table layout in one place so the core modules
//! stay free of presentation concerns.

use crate::coordinator::DesktopView;
use crate::file_operations::BatchOutcome;
use crate::score::{Level, ScoreModel};
use crate::snapshot::Item;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Spinner shown while a scan runs.
    pub fn scan_spinner(message: &str) -> ProgressBar {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(80));
        spinner
    }

    /// One-line score summary, colored by level.
    pub fn score_line(score: &ScoreModel) -> String {
        let label = match score.level {
            Level::Good => score.level.label().green(),
            Level::Medium => score.level.label().yellow(),
            Level::Bad => score.level.label().red(),
        };
        format!(
            "Cleanliness {}/100 ({}) · {} files, {} old, average age {:.1} days",
            score.score.to_string().bold(),
            label,
            score.file_count,
            score.old_file_count,
            score.average_age_days
        )
    }

    /// Prints the score and both item lists.
    pub fn print_view(view: &DesktopView) {
        println!("{}", Self::score_line(&view.score));
        println!(
            "Showing files at least {} days old, sorted by {}",
            view.min_age.days(),
            view.sort
        );

        Self::header("CLEANUP CANDIDATES");
        if view.actionable.is_empty() {
            Self::success("Nothing to clean up.");
        } else {
            Self::item_table(&view.actionable);
        }

        if !view.ignored.is_empty() {
            Self::header("IGNORED");
            Self::item_table(&view.ignored);
        }
    }

    /// Prints items as name / size / age columns.
    pub fn item_table(items: &[Item]) {
        let width = items
            .iter()
            .map(|item| item.file_name().chars().count())
            .max()
            .unwrap_or(0)
            .max(4);

        println!(
            "{:<width$} | {:>10} | {}",
            "Name".bold(),
            "Size".bold(),
            "Age".bold(),
            width = width
        );
        println!("{}", "-".repeat(width + 24));
        for item in items {
            println!(
                "{:<width$} | {:>10} | {} {}",
                item.file_name(),
                human_size(item.size),
                item.age_days.to_string().yellow(),
                if item.age_days == 1 { "day" } else { "days" },
                width = width
            );
        }
    }

    /// Reports what a bulk action managed before stopping.
    pub fn batch_summary(action: &str, outcome: &BatchOutcome) {
        let noun = if outcome.processed == 1 { "file" } else { "files" };
        match &outcome.error {
            None => Self::success(&format!("{} {} {}", action, outcome.processed, noun)),
            Some(e) => {
                Self::warning(&format!(
                    "{} {} {} before stopping",
                    action, outcome.processed, noun
                ));
                Self::error(&e.to_string());
            }
        }
    }
}

/// Formats a byte count with a binary unit suffix.
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
