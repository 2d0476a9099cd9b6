//! Cleanliness scoring.
//!
//! The score is a 0–100 heuristic over the actionable items: a handful of
//! recent files costs nothing, while many stale files drive it toward zero.

use crate::snapshot::Item;
use serde::Serialize;

const CLUTTER_PENALTY_PER_FILE: u32 = 2;
const CLUTTER_PENALTY_CAP: u32 = 30;
const STALENESS_PENALTY_FACTOR: f64 = 1.2;
const STALENESS_PENALTY_CAP: u32 = 30;
const OLD_FILE_PENALTY_PER_FILE: u32 = 3;
const OLD_FILE_PENALTY_CAP: u32 = 40;

/// Qualitative health level derived from the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Good,
    Medium,
    Bad,
}

impl Level {
    pub fn label(&self) -> &'static str {
        match self {
            Level::Good => "good",
            Level::Medium => "medium",
            Level::Bad => "bad",
        }
    }
}

/// Score summary for one refresh. Always recomputed as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreModel {
    pub file_count: usize,
    pub old_file_count: usize,
    pub average_age_days: f64,
    pub score: u8,
    pub level: Level,
}

impl Default for ScoreModel {
    fn default() -> Self {
        Self::from_counts(0, 0, 0.0)
    }
}

impl ScoreModel {
    /// Builds the model from raw counts.
    pub fn from_counts(file_count: usize, old_file_count: usize, average_age_days: f64) -> Self {
        let average_age_days = finite_or_zero(average_age_days);
        let score = score(file_count, old_file_count, average_age_days);
        Self {
            file_count,
            old_file_count,
            average_age_days,
            score,
            level: level_for(score, file_count, old_file_count, average_age_days),
        }
    }

    /// Builds the model over `items`, counting as old every item at least
    /// `old_threshold_days` old.
    pub fn from_items(items: &[Item], old_threshold_days: u32) -> Self {
        if items.is_empty() {
            return Self::default();
        }

        let old_file_count = items
            .iter()
            .filter(|item| item.age_days >= old_threshold_days)
            .count();
        let total_age: f64 = items.iter().map(|item| f64::from(item.age_days)).sum();

        Self::from_counts(items.len(), old_file_count, total_age / items.len() as f64)
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

fn saturating_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Computes the 0–100 cleanliness score.
pub fn score(file_count: usize, old_file_count: usize, average_age_days: f64) -> u8 {
    let average_age_days = finite_or_zero(average_age_days).max(0.0);
    let mut penalty: u32 = 0;

    if old_file_count > 0 {
        let clutter = saturating_u32(file_count).saturating_mul(CLUTTER_PENALTY_PER_FILE);
        penalty += clutter.min(CLUTTER_PENALTY_CAP);

        let staleness = (average_age_days * STALENESS_PENALTY_FACTOR)
            .round()
            .min(f64::from(STALENESS_PENALTY_CAP));
        penalty += staleness as u32;
    }

    let old_files = saturating_u32(old_file_count).saturating_mul(OLD_FILE_PENALTY_PER_FILE);
    penalty += old_files.min(OLD_FILE_PENALTY_CAP);

    100u32.saturating_sub(penalty) as u8
}

/// Derives the qualitative level from a score and its inputs.
///
/// The bad conditions are checked first, so a high score with a mostly-old
/// actionable set is still [`Level::Bad`].
pub fn level_for(
    score: u8,
    file_count: usize,
    old_file_count: usize,
    average_age_days: f64,
) -> Level {
    let average_age_days = finite_or_zero(average_age_days);
    let old_ratio = if file_count == 0 {
        0.0
    } else {
        old_file_count as f64 / file_count as f64
    };

    if score < 30 || old_ratio >= 0.85 || average_age_days >= 90.0 {
        Level::Bad
    } else if score >= 80 && old_file_count <= 5 && average_age_days <= 14.0 {
        Level::Good
    } else {
        Level::Medium
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use proptest::prelude::*;
    use std::path::PathBuf;

    #[test]
    fn test_empty_is_perfect() {
        let model = ScoreModel::from_items(&[], 21);
        assert_eq!(model.file_count, 0);
        assert_eq!(model.old_file_count, 0);
        assert_eq!(model.average_age_days, 0.0);
        assert_eq!(model.score, 100);
        assert_eq!(model.level, Level::Good);
    }

    #[test]
    fn test_no_old_files_only_old_penalty_applies() {
        // Clutter and staleness penalties need at least one old file.
        assert_eq!(score(50, 0, 60.0), 100);
    }

    #[test]
    fn test_penalties_add_up() {
        // 100 - min(20, 30) - min(round(12), 30) - min(12, 40)
        assert_eq!(score(10, 4, 10.0), 56);
    }

    #[test]
    fn test_penalties_are_capped() {
        // 100 - 30 - 30 - 40
        assert_eq!(score(1000, 1000, 1000.0), 0);
    }

    #[test]
    fn test_non_finite_average_is_zero() {
        let model = ScoreModel::from_counts(3, 1, f64::NAN);
        assert_eq!(model.average_age_days, 0.0);
        assert_eq!(score(3, 1, f64::INFINITY), score(3, 1, 0.0));
    }

    #[test]
    fn test_level_bad_on_old_ratio() {
        assert_eq!(level_for(90, 10, 9, 5.0), Level::Bad);
    }

    #[test]
    fn test_level_bad_on_average_age() {
        assert_eq!(level_for(90, 10, 0, 90.0), Level::Bad);
    }

    #[test]
    fn test_level_bad_wins_over_good() {
        // One 7-day file with no stale offset: score 87 but every file is old.
        assert_eq!(level_for(87, 1, 1, 7.0), Level::Bad);
    }

    #[test]
    fn test_level_medium() {
        assert_eq!(level_for(60, 10, 4, 10.0), Level::Medium);
        assert_eq!(level_for(85, 10, 6, 10.0), Level::Medium);
    }

    #[test]
    fn test_level_zero_files_does_not_divide() {
        assert_eq!(level_for(100, 0, 0, 0.0), Level::Good);
    }

    #[test]
    fn test_from_items_counts_old_files() {
        let now = Utc::now();
        let items: Vec<Item> = [3, 25, 30, 40]
            .iter()
            .enumerate()
            .map(|(i, days)| {
                Item::new(
                    PathBuf::from(format!("/desk/{i}.txt")),
                    now - Duration::days(*days),
                    1,
                    now,
                )
            })
            .collect();

        let model = ScoreModel::from_items(&items, 21);
        assert_eq!(model.file_count, 4);
        assert_eq!(model.old_file_count, 3);
        assert_eq!(model.average_age_days, 24.5);
    }

    #[test]
    fn test_ninety_five_day_desktop_is_bad() {
        let model = ScoreModel::from_counts(10, 10, 95.0);
        assert_eq!(model.level, Level::Bad);
    }

    proptest! {
        #[test]
        fn prop_score_in_range(
            files in 0usize..10_000,
            old in 0usize..10_000,
            avg in -1e6f64..1e6,
        ) {
            let s = score(files, old, avg);
            prop_assert!(s <= 100);
        }

        #[test]
        fn prop_more_old_files_never_raise_score(
            files in 0usize..500,
            old in 0usize..500,
            avg in 0f64..500.0,
        ) {
            prop_assert!(score(files, old + 1, avg) <= score(files, old, avg));
        }
    }
}
