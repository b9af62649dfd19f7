use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::error::{DashboardError, Result};
use crate::providers::PullRequest;

/// Label value that selects pull requests without any label.
pub const NO_LABEL: &str = "none";

/// Which dashboard card a PR list is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardKind {
    Available,
    Labeled,
    Closed,
    All,
}

impl FromStr for CardKind {
    type Err = DashboardError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "open" | "available" => Ok(Self::Available),
            "labeled" => Ok(Self::Labeled),
            "closed" => Ok(Self::Closed),
            "all" => Ok(Self::All),
            other => Err(DashboardError::validation(format!(
                "type must be one of open, labeled, closed, all (got '{other}')"
            ))),
        }
    }
}

/// A `YYYY-MM` month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Month(String);

impl Month {
    pub fn contains(&self, pull: &PullRequest) -> bool {
        pull.created_month() == self.0
    }
}

impl FromStr for Month {
    type Err = DashboardError;

    fn from_str(value: &str) -> Result<Self> {
        let value = value.trim();
        let well_formed = value.len() == 7
            && NaiveDate::parse_from_str(&format!("{value}-01"), "%Y-%m-%d").is_ok();
        if !well_formed {
            return Err(DashboardError::validation(format!(
                "month must be formatted YYYY-MM (got '{value}')"
            )));
        }
        Ok(Self(value.to_string()))
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Case-insensitive label match; `None` selects unlabeled pull requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelFilter {
    include_unlabeled: bool,
    labels: BTreeSet<String>,
}

impl LabelFilter {
    /// Returns `None` when no usable label was given.
    pub fn from_values<I, S>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut include_unlabeled = false;
        let mut labels = BTreeSet::new();

        for value in values {
            let value = value.as_ref().trim().to_lowercase();
            if value.is_empty() {
                continue;
            }
            if value == NO_LABEL {
                include_unlabeled = true;
            } else {
                labels.insert(value);
            }
        }

        (include_unlabeled || !labels.is_empty()).then_some(Self {
            include_unlabeled,
            labels,
        })
    }

    pub fn matches(&self, pull: &PullRequest) -> bool {
        if pull.labels.is_empty() {
            return self.include_unlabeled;
        }
        pull.labels
            .iter()
            .any(|label| self.labels.contains(&label.to_lowercase()))
    }
}

/// Post-fetch filters; never part of a cache key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayFilters {
    pub month: Option<Month>,
    pub labels: Option<LabelFilter>,
    search: Option<String>,
}

impl DisplayFilters {
    pub fn new(month: Option<Month>, labels: Option<LabelFilter>, search: Option<&str>) -> Self {
        let search = search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        Self {
            month,
            labels,
            search,
        }
    }

    /// Label, then month, then free-text search.
    pub fn matches(&self, pull: &PullRequest) -> bool {
        self.labels.as_ref().map_or(true, |f| f.matches(pull))
            && self.month.as_ref().map_or(true, |m| m.contains(pull))
            && self
                .search
                .as_deref()
                .map_or(true, |needle| pull.title.to_lowercase().contains(needle))
    }
}
