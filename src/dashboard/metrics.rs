use std::collections::BTreeSet;

use super::filters::{CardKind, DisplayFilters};
use crate::insights::PrStats;
use crate::providers::{PullRequest, PullState};

/// State filter first, then the display filters.
pub fn select<'a>(
    pulls: &'a [PullRequest],
    state: Option<PullState>,
    filters: &DisplayFilters,
) -> Vec<&'a PullRequest> {
    pulls
        .iter()
        .filter(|p| state.map_or(true, |s| p.state == s))
        .filter(|p| filters.matches(p))
        .collect()
}

/// Pull requests behind one dashboard card.
///
/// The labeled card is empty until a label filter is given.
pub fn card_pulls<'a>(
    pulls: &'a [PullRequest],
    card: CardKind,
    filters: &DisplayFilters,
) -> Vec<&'a PullRequest> {
    match card {
        CardKind::Available => select(pulls, Some(PullState::Open), filters),
        CardKind::Closed => select(pulls, Some(PullState::Closed), filters),
        CardKind::All => select(pulls, None, filters),
        CardKind::Labeled if filters.labels.is_some() => {
            select(pulls, Some(PullState::Open), filters)
        }
        CardKind::Labeled => Vec::new(),
    }
}

pub fn pr_stats(pulls: &[PullRequest], filters: &DisplayFilters) -> PrStats {
    let available = card_pulls(pulls, CardKind::Available, filters).len();
    let labeled = card_pulls(pulls, CardKind::Labeled, filters).len();
    let closed = card_pulls(pulls, CardKind::Closed, filters).len();

    PrStats {
        available,
        labeled,
        closed,
        total: available + closed,
    }
}

/// Distinct creation months, newest first.
pub fn available_months(pulls: &[PullRequest]) -> Vec<String> {
    let months: BTreeSet<String> = pulls.iter().map(PullRequest::created_month).collect();
    months.into_iter().rev().collect()
}

/// Distinct label names, ascending.
pub fn available_labels(pulls: &[PullRequest]) -> Vec<String> {
    let labels: BTreeSet<&String> = pulls.iter().flat_map(|p| &p.labels).collect();
    labels.into_iter().cloned().collect()
}
