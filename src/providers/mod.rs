pub mod github;
#[cfg(test)]
pub mod stub;

use std::collections::BTreeSet;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::RepoId;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PullState {
    Open,
    Closed,
}

impl PullState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for PullState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a pull request as fetched from upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub state: PullState,
    pub labels: BTreeSet<String>,
    pub requested_reviewers: BTreeSet<String>,
    pub html_url: String,
}

impl PullRequest {
    /// Creation month as `YYYY-MM`.
    pub fn created_month(&self) -> String {
        self.created_at.format("%Y-%m").to_string()
    }
}

/// Where pull request data comes from.
#[async_trait]
pub trait PullRequestSource: Send + Sync {
    /// Every pull request of `repo` in `state`, all pages drained.
    async fn pull_requests(&self, repo: &RepoId, state: PullState) -> Result<Vec<PullRequest>>;

    /// Logins currently requested to review pull request `number`.
    async fn requested_reviewers(&self, repo: &RepoId, number: u64) -> Result<Vec<String>>;
}
