use std::collections::{BTreeSet, HashMap};

use crate::insights::ReviewerStat;

/// Outcome of one per-PR review-request lookup.
#[derive(Debug, Clone)]
pub enum ReviewerLookup {
    Found(Vec<String>),
    /// Tolerated failure; the PR counts as having no reviewers.
    Failed,
}

/// Counts, per reviewer, the open PRs they are requested on.
///
/// Sorted by descending count, then ascending login.
pub fn rank_reviewers<'a, I>(assignments: I) -> Vec<ReviewerStat>
where
    I: IntoIterator<Item = &'a [String]>,
{
    let mut counts: HashMap<&str, usize> = HashMap::new();

    for reviewers in assignments {
        let distinct: BTreeSet<&str> = reviewers.iter().map(String::as_str).collect();
        for reviewer in distinct {
            *counts.entry(reviewer).or_insert(0) += 1;
        }
    }

    let mut stats: Vec<ReviewerStat> = counts
        .into_iter()
        .map(|(reviewer, open_prs)| ReviewerStat {
            reviewer: reviewer.to_string(),
            open_prs,
        })
        .collect();

    stats.sort_by(|a, b| {
        b.open_prs
            .cmp(&a.open_prs)
            .then_with(|| a.reviewer.cmp(&b.reviewer))
    });
    stats
}
