use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DashboardError;

/// Workflow bucket a raw Jira status falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCategory {
    ToDo,
    InProgress,
    CodeReview,
    QatTesting,
    Blocked,
    Done,
    Uncategorized,
}

impl StatusCategory {
    /// Display order of the summary buckets.
    pub const ALL: [StatusCategory; 7] = [
        Self::ToDo,
        Self::InProgress,
        Self::CodeReview,
        Self::QatTesting,
        Self::Blocked,
        Self::Done,
        Self::Uncategorized,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            Self::ToDo => "to_do",
            Self::InProgress => "in_progress",
            Self::CodeReview => "code_review",
            Self::QatTesting => "qat_testing",
            Self::Blocked => "blocked",
            Self::Done => "done",
            Self::Uncategorized => "uncategorized",
        }
    }

    fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::ToDo => &[
                "to do",
                "todo",
                "open",
                "backlog",
                "new",
                "selected for development",
            ],
            Self::InProgress => &["in progress", "in development", "in dev"],
            Self::CodeReview => &["code review", "in review", "review", "peer review"],
            Self::QatTesting => &["qat-testing", "qat", "qa", "testing", "in testing", "in qa"],
            Self::Blocked => &["blocked", "on hold"],
            Self::Done => &["done", "closed", "resolved", "complete", "released"],
            Self::Uncategorized => &[],
        }
    }

    /// Maps a raw status onto its bucket.
    ///
    /// Exact alias matches win over prefix matches.
    pub fn normalize(raw: &str) -> Self {
        let status = raw.trim().to_lowercase();
        if status.is_empty() {
            return Self::Uncategorized;
        }

        let exact = Self::ALL
            .iter()
            .copied()
            .find(|category| category.aliases().contains(&status.as_str()));

        exact
            .or_else(|| {
                Self::ALL.iter().copied().find(|category| {
                    category
                        .aliases()
                        .iter()
                        .any(|alias| status.starts_with(alias))
                })
            })
            .unwrap_or(Self::Uncategorized)
    }
}

impl fmt::Display for StatusCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for StatusCategory {
    type Err = DashboardError;

    /// Accepts a bucket slug, or any raw status which is then normalized.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if value.is_empty() {
            return Err(DashboardError::validation("status must not be empty"));
        }

        let slug = value.to_ascii_lowercase();
        Ok(Self::ALL
            .iter()
            .copied()
            .find(|category| category.slug() == slug)
            .unwrap_or_else(|| Self::normalize(value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_exact_aliases() {
        let cases = [
            ("To Do", StatusCategory::ToDo),
            ("BACKLOG", StatusCategory::ToDo),
            ("In Progress", StatusCategory::InProgress),
            ("Code Review", StatusCategory::CodeReview),
            ("QAT-Testing", StatusCategory::QatTesting),
            ("On Hold", StatusCategory::Blocked),
            ("Resolved", StatusCategory::Done),
        ];

        for (raw, expected) in cases {
            assert_eq!(StatusCategory::normalize(raw), expected, "{raw}");
        }
    }

    #[test]
    fn test_normalize_prefix_match() {
        assert_eq!(
            StatusCategory::normalize("In Progress - Backend"),
            StatusCategory::InProgress
        );
        assert_eq!(
            StatusCategory::normalize("Done (won't fix)"),
            StatusCategory::Done
        );
    }

    #[test]
    fn test_normalize_unknown_falls_back() {
        assert_eq!(
            StatusCategory::normalize("Awaiting Legal"),
            StatusCategory::Uncategorized
        );
        assert_eq!(StatusCategory::normalize("   "), StatusCategory::Uncategorized);
    }

    #[test]
    fn test_parse_slug_or_raw_status() {
        assert_eq!(
            "qat_testing".parse::<StatusCategory>().unwrap(),
            StatusCategory::QatTesting
        );
        assert_eq!(
            "In Review".parse::<StatusCategory>().unwrap(),
            StatusCategory::CodeReview
        );
        assert_eq!(
            "uncategorized".parse::<StatusCategory>().unwrap(),
            StatusCategory::Uncategorized
        );
        assert!("".parse::<StatusCategory>().is_err());
    }

    #[test]
    fn test_serializes_as_slug() {
        assert_eq!(
            serde_json::to_string(&StatusCategory::InProgress).unwrap(),
            "\"in_progress\""
        );
        for category in StatusCategory::ALL {
            assert_eq!(
                serde_json::to_value(category).unwrap(),
                serde_json::Value::String(category.slug().to_string())
            );
        }
    }
}
