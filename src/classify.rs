//! Splits a snapshot into actionable and ignored items.

use crate::snapshot::Item;
use std::collections::BTreeSet;

/// Smallest allowed age filter, in days.
pub const MIN_AGE_DAYS: u32 = 1;
/// Largest allowed age filter, in days.
pub const MAX_AGE_DAYS: u32 = 2000;

/// The user-facing minimum age, always within `[MIN_AGE_DAYS, MAX_AGE_DAYS]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct AgeThreshold(u32);

impl AgeThreshold {
    /// Out-of-range values are clamped, never rejected.
    pub fn new(days: u32) -> Self {
        Self(days.clamp(MIN_AGE_DAYS, MAX_AGE_DAYS))
    }

    pub fn days(self) -> u32 {
        self.0
    }
}

impl Default for AgeThreshold {
    fn default() -> Self {
        Self(7)
    }
}

/// Result of classifying one snapshot.
#[derive(Debug, Clone, Default)]
pub struct Classification {
    /// Old enough and not ignored: cleanup candidates.
    pub actionable: Vec<Item>,
    /// Path is in the ignore set, whatever its age.
    pub ignored: Vec<Item>,
}

/// Classifies `items` against the age threshold and the ignore set.
///
/// Items younger than the threshold that are not ignored land in neither list.
pub fn classify(
    items: Vec<Item>,
    min_age: AgeThreshold,
    ignore_set: &BTreeSet<String>,
) -> Classification {
    let mut result = Classification::default();

    for item in items {
        if ignore_set.contains(&item.path_key()) {
            result.ignored.push(item);
        } else if item.age_days >= min_age.days() {
            result.actionable.push(item);
        }
    }

    result
}
