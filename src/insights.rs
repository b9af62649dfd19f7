use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pagination::Page;
use crate::providers::{PullRequest, PullState};

/// Card totals for the PR dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrStats {
    pub available: usize,
    pub labeled: usize,
    pub closed: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrSummary {
    pub number: u64,
    pub title: String,
    pub author: String,
    pub state: PullState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub html_url: String,
    pub labels: Vec<String>,
}

impl From<&PullRequest> for PrSummary {
    fn from(pull: &PullRequest) -> Self {
        Self {
            number: pull.number,
            title: pull.title.clone(),
            author: pull.author.clone(),
            state: pull.state,
            created_at: pull.created_at,
            updated_at: pull.updated_at,
            html_url: pull.html_url.clone(),
            labels: pull.labels.iter().cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewerStat {
    pub reviewer: String,
    pub open_prs: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewerWorkload {
    #[serde(flatten)]
    pub page: Page<ReviewerStat>,
    pub open_prs_scanned: usize,
    /// Per-PR lookups that failed and were counted as having no reviewers.
    pub failed_fetches: usize,
}
