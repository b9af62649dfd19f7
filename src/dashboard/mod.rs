//! Pull request aggregation over a time-bounded snapshot cache.

pub mod filters;
mod metrics;
mod reviewers;

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use futures::{stream, StreamExt};
use log::{info, warn};
use serde::Serialize;
use tokio::sync::Semaphore;

use crate::cache::{CacheInfo, Clock, TtlCache};
use crate::config::RepoId;
use crate::error::{DashboardError, Result};
use crate::insights::{PrStats, PrSummary, ReviewerWorkload};
use crate::pagination::{Page, PageRequest};
use crate::providers::{PullRequest, PullRequestSource, PullState};
use filters::{CardKind, DisplayFilters};
use reviewers::{rank_reviewers, ReviewerLookup};

pub const SNAPSHOT_TTL: TimeDelta = TimeDelta::minutes(15);
pub const REVIEWER_TTL: TimeDelta = TimeDelta::minutes(5);
pub const REVIEWER_PAGE_SIZE: usize = 6;
pub const PR_PAGE_SIZE: usize = 10;

/// Every open and closed pull request of a repository at one point in time.
#[derive(Debug, Clone)]
pub struct PullSnapshot {
    pub pulls: Vec<PullRequest>,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DashboardCacheInfo {
    pub pull_requests: CacheInfo,
    pub review_requests: CacheInfo,
}

pub struct Dashboard {
    source: Arc<dyn PullRequestSource>,
    default_repo: RepoId,
    snapshots: TtlCache<RepoId, Arc<PullSnapshot>>,
    reviewers: TtlCache<(RepoId, u64), Arc<Vec<String>>>,
    fanout: Semaphore,
    fanout_limit: usize,
    clock: Arc<dyn Clock>,
}

impl Dashboard {
    pub fn new(
        source: Arc<dyn PullRequestSource>,
        default_repo: RepoId,
        fanout_limit: usize,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let fanout_limit = fanout_limit.max(1);

        Self {
            source,
            default_repo,
            snapshots: TtlCache::new(SNAPSHOT_TTL, clock.clone()),
            reviewers: TtlCache::new(REVIEWER_TTL, clock.clone()),
            fanout: Semaphore::new(fanout_limit),
            fanout_limit,
            clock,
        }
    }

    pub fn default_repo(&self) -> &RepoId {
        &self.default_repo
    }

    /// Cached snapshot for `repo`, fetched from upstream once it has expired.
    pub async fn snapshot(&self, repo: &RepoId) -> Result<Arc<PullSnapshot>> {
        self.snapshots
            .get_or_populate(repo.clone(), || self.fetch_snapshot(repo))
            .await
    }

    async fn fetch_snapshot(&self, repo: &RepoId) -> Result<Arc<PullSnapshot>> {
        info!("Refreshing pull request snapshot for {repo}");

        let (open, closed) = tokio::try_join!(
            self.source.pull_requests(repo, PullState::Open),
            self.source.pull_requests(repo, PullState::Closed),
        )?;

        info!(
            "Snapshot for {repo}: {} open, {} closed",
            open.len(),
            closed.len()
        );

        let mut pulls = open;
        pulls.extend(closed);

        Ok(Arc::new(PullSnapshot {
            pulls,
            fetched_at: self.clock.now(),
        }))
    }

    pub async fn pr_stats(&self, repo: &RepoId, filters: &DisplayFilters) -> Result<PrStats> {
        let snapshot = self.snapshot(repo).await?;
        Ok(metrics::pr_stats(&snapshot.pulls, filters))
    }

    pub async fn pull_requests(
        &self,
        repo: &RepoId,
        card: CardKind,
        filters: &DisplayFilters,
        page: PageRequest,
    ) -> Result<Page<PrSummary>> {
        let snapshot = self.snapshot(repo).await?;
        let summaries: Vec<PrSummary> = metrics::card_pulls(&snapshot.pulls, card, filters)
            .into_iter()
            .map(PrSummary::from)
            .collect();

        Ok(page.slice(&summaries))
    }

    pub async fn available_months(&self, repo: &RepoId) -> Result<Vec<String>> {
        let snapshot = self.snapshot(repo).await?;
        Ok(metrics::available_months(&snapshot.pulls))
    }

    pub async fn available_labels(&self, repo: &RepoId) -> Result<Vec<String>> {
        let snapshot = self.snapshot(repo).await?;
        Ok(metrics::available_labels(&snapshot.pulls))
    }

    /// Reviewer workload over the open pull requests of `repo`.
    ///
    /// Review requests are looked up per PR, concurrently, and all lookups
    /// finish before ranking. A failed lookup counts the PR as unreviewed.
    pub async fn reviewer_workload(
        &self,
        repo: &RepoId,
        page: PageRequest,
    ) -> Result<ReviewerWorkload> {
        let snapshot = self.snapshot(repo).await?;
        let open: Vec<u64> = snapshot
            .pulls
            .iter()
            .filter(|p| p.state == PullState::Open)
            .map(|p| p.number)
            .collect();
        let open_prs_scanned = open.len();

        let lookups: Vec<ReviewerLookup> = stream::iter(open)
            .map(|number| self.lookup_reviewers(repo, number))
            .buffer_unordered(self.fanout_limit)
            .collect()
            .await;

        let failed_fetches = lookups
            .iter()
            .filter(|l| matches!(l, ReviewerLookup::Failed))
            .count();
        if failed_fetches > 0 {
            warn!("{failed_fetches} of {open_prs_scanned} review request lookups failed for {repo}");
        }

        let ranked = rank_reviewers(lookups.iter().filter_map(|lookup| match lookup {
            ReviewerLookup::Found(logins) => Some(logins.as_slice()),
            ReviewerLookup::Failed => None,
        }));

        Ok(ReviewerWorkload {
            page: page.slice(&ranked),
            open_prs_scanned,
            failed_fetches,
        })
    }

    async fn lookup_reviewers(&self, repo: &RepoId, number: u64) -> ReviewerLookup {
        let result = self
            .reviewers
            .get_or_populate((repo.clone(), number), || async {
                let _permit = self
                    .fanout
                    .acquire()
                    .await
                    .map_err(|e| DashboardError::PartialFetch(e.to_string()))?;
                self.source
                    .requested_reviewers(repo, number)
                    .await
                    .map(Arc::new)
            })
            .await;

        match result {
            Ok(logins) => ReviewerLookup::Found(logins.as_ref().clone()),
            Err(err) => {
                let partial = DashboardError::PartialFetch(format!("{repo}#{number}: {err}"));
                warn!("{partial}");
                ReviewerLookup::Failed
            }
        }
    }

    /// Drops the cached snapshot of `repo`. Ticket data is not affected.
    pub fn refresh(&self, repo: &RepoId) -> bool {
        let purged = self.reviewers.purge_expired();
        let dropped = self.snapshots.invalidate(repo);
        info!("Pull request cache refresh for {repo} (snapshot dropped: {dropped}, expired review lookups purged: {purged})");
        dropped
    }

    /// When the live snapshot of `repo` was fetched, if there is one.
    pub fn snapshot_fetched_at(&self, repo: &RepoId) -> Option<DateTime<Utc>> {
        self.snapshots.get(repo).map(|snapshot| snapshot.fetched_at)
    }

    pub fn cache_info(&self) -> DashboardCacheInfo {
        DashboardCacheInfo {
            pull_requests: self.snapshots.info(),
            review_requests: self.reviewers.info(),
        }
    }
}
