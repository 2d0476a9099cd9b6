//! Ordering of item lists.
//!
//! Ties on the active key are broken by path (ascending), so every sort is a
//! total, repeatable order.

use crate::snapshot::Item;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// The attribute items are ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Name,
    /// Last-modified timestamp.
    Date,
    /// Age in days at snapshot time.
    Age,
    Size,
    /// File extension.
    Type,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    #[serde(rename = "asc", alias = "ascending")]
    Ascending,
    #[serde(rename = "desc", alias = "descending")]
    Descending,
}

/// The active (key, direction) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SortSpec {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// All ten supported combinations.
    pub fn all() -> impl Iterator<Item = SortSpec> {
        [
            SortKey::Name,
            SortKey::Date,
            SortKey::Age,
            SortKey::Size,
            SortKey::Type,
        ]
        .into_iter()
        .flat_map(|key| {
            [SortDirection::Ascending, SortDirection::Descending]
                .into_iter()
                .map(move |direction| SortSpec::new(key, direction))
        })
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "name" => Ok(SortKey::Name),
            "date" | "modified" => Ok(SortKey::Date),
            "age" => Ok(SortKey::Age),
            "size" => Ok(SortKey::Size),
            "type" | "extension" => Ok(SortKey::Type),
            other => Err(format!("unknown sort key '{other}'")),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SortKey::Name => "name",
            SortKey::Date => "date",
            SortKey::Age => "age",
            SortKey::Size => "size",
            SortKey::Type => "type",
        };
        f.write_str(name)
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Ascending),
            "desc" | "descending" => Ok(SortDirection::Descending),
            other => Err(format!("unknown sort direction '{other}'")),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        })
    }
}

/// Parses `key` or `key:direction`, e.g. `size:desc`.
impl FromStr for SortSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((key, direction)) => Ok(SortSpec::new(key.parse()?, direction.parse()?)),
            None => Ok(SortSpec::new(s.parse()?, SortDirection::Ascending)),
        }
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.key, self.direction)
    }
}

fn compare_key(a: &Item, b: &Item, key: SortKey) -> Ordering {
    match key {
        SortKey::Name => a.file_name().to_lowercase().cmp(&b.file_name().to_lowercase()),
        SortKey::Date => a.modified.cmp(&b.modified),
        SortKey::Age => a.age_days.cmp(&b.age_days),
        SortKey::Size => a.size.cmp(&b.size),
        SortKey::Type => a.extension().cmp(&b.extension()),
    }
}

fn compare_path(a: &Item, b: &Item) -> Ordering {
    let a_key = a.path_key();
    let b_key = b.path_key();
    a_key
        .to_lowercase()
        .cmp(&b_key.to_lowercase())
        .then_with(|| a_key.cmp(&b_key))
}

/// Sorts `items` in place according to `spec`.
pub fn sort_items(items: &mut [Item], spec: SortSpec) {
    items.sort_by(|a, b| {
        let primary = compare_key(a, b, spec.key);
        let primary = match spec.direction {
            SortDirection::Ascending => primary,
            SortDirection::Descending => primary.reverse(),
        };
        primary.then_with(|| compare_path(a, b))
    });
}
