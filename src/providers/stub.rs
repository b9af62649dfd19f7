//! Deterministic in-memory source for tests.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{PullRequest, PullRequestSource, PullState};
use crate::config::RepoId;
use crate::error::{DashboardError, Result};

#[derive(Default)]
pub struct StubSource {
    pulls: Vec<PullRequest>,
    reviewers: HashMap<u64, Vec<String>>,
    failing_reviewers: HashSet<u64>,
    fail_pulls: bool,
    pub pull_calls: AtomicUsize,
    pub reviewer_calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub repos_seen: Mutex<Vec<String>>,
}

impl StubSource {
    pub fn new(pulls: Vec<PullRequest>) -> Self {
        Self {
            pulls,
            ..Self::default()
        }
    }

    pub fn with_reviewers(mut self, number: u64, logins: &[&str]) -> Self {
        self.reviewers
            .insert(number, logins.iter().map(|l| l.to_string()).collect());
        self
    }

    pub fn with_failing_reviewers(mut self, number: u64) -> Self {
        self.failing_reviewers.insert(number);
        self
    }

    pub fn failing() -> Self {
        Self {
            fail_pulls: true,
            ..Self::default()
        }
    }

    pub fn pull_fetches(&self) -> usize {
        self.pull_calls.load(Ordering::SeqCst)
    }

    pub fn reviewer_fetches(&self) -> usize {
        self.reviewer_calls.load(Ordering::SeqCst)
    }
}

pub fn pull(number: u64, state: PullState, labels: &[&str], created: &str) -> PullRequest {
    let created_at: DateTime<Utc> = format!("{created}T10:00:00Z")
        .parse()
        .expect("fixture dates are valid");
    PullRequest {
        number,
        title: format!("Change {number}"),
        author: "alice".to_string(),
        created_at,
        updated_at: created_at,
        state,
        labels: labels.iter().map(|l| l.to_string()).collect(),
        requested_reviewers: BTreeSet::new(),
        html_url: format!("https://github.com/octo/widgets/pull/{number}"),
    }
}

#[async_trait]
impl PullRequestSource for StubSource {
    async fn pull_requests(&self, repo: &RepoId, state: PullState) -> Result<Vec<PullRequest>> {
        self.pull_calls.fetch_add(1, Ordering::SeqCst);
        self.repos_seen
            .lock()
            .expect("stub lock")
            .push(repo.to_string());
        if self.fail_pulls {
            return Err(DashboardError::UpstreamAuth("bad token".to_string()));
        }
        Ok(self
            .pulls
            .iter()
            .filter(|p| p.state == state)
            .cloned()
            .collect())
    }

    async fn requested_reviewers(&self, _repo: &RepoId, number: u64) -> Result<Vec<String>> {
        self.reviewer_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_reviewers.contains(&number) {
            return Err(DashboardError::Upstream {
                status: 502,
                message: format!("review requests for #{number} unavailable"),
            });
        }
        Ok(self.reviewers.get(&number).cloned().unwrap_or_default())
    }
}
