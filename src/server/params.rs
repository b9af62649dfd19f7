//! Query string parsing shared by the route handlers.

use crate::config::RepoId;
use crate::dashboard::filters::{CardKind, DisplayFilters, LabelFilter, Month};
use crate::error::{DashboardError, Result};
use crate::jira::StatusCategory;
use crate::pagination::PageRequest;

/// Raw query pairs; keys may repeat.
#[derive(Debug, Default)]
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self(pairs)
    }

    fn values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |(key, _)| key == name)
            .map(|(_, value)| value.trim())
            .filter(|value| !value.is_empty())
    }

    fn first(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .filter(|(key, _)| key == name)
            .map(|(_, value)| value.trim())
            .find(|value| !value.is_empty())
    }

    fn number(&self, name: &str) -> Result<Option<i64>> {
        self.first(name)
            .map(|raw| {
                raw.parse::<i64>().map_err(|_| {
                    DashboardError::validation(format!("{name} must be an integer (got '{raw}')"))
                })
            })
            .transpose()
    }

    /// The `repo` override, or the configured default.
    pub fn repo(&self, default: &RepoId) -> Result<RepoId> {
        match self.first("repo") {
            Some(raw) => raw.parse(),
            None => Ok(default.clone()),
        }
    }

    /// Labels may be repeated, comma-separated, or both.
    pub fn labels(&self) -> Option<LabelFilter> {
        LabelFilter::from_values(self.values("labels").flat_map(|value| value.split(',')))
    }

    pub fn month(&self) -> Result<Option<Month>> {
        self.first("month").map(str::parse).transpose()
    }

    pub fn display_filters(&self) -> Result<DisplayFilters> {
        Ok(DisplayFilters::new(
            self.month()?,
            self.labels(),
            self.first("search"),
        ))
    }

    pub fn page(&self, default_size: usize) -> Result<PageRequest> {
        Ok(PageRequest::clamped(
            self.number("page")?,
            self.number("page_size")?,
            default_size,
        ))
    }

    /// Card type; open when absent.
    pub fn card(&self) -> Result<CardKind> {
        self.first("type")
            .map_or(Ok(CardKind::Available), str::parse)
    }

    pub fn status(&self) -> Result<Option<StatusCategory>> {
        self.first("status").map(str::parse).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Params {
        Params::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_labels_repeated_and_comma_separated() {
        let parsed = params(&[("labels", "bug,ui"), ("labels", "docs"), ("labels", "")]);
        let expected = LabelFilter::from_values(["bug", "ui", "docs"]);

        assert_eq!(parsed.labels(), expected);
        assert_eq!(params(&[]).labels(), None);
    }

    #[test]
    fn test_invalid_month_is_rejected() {
        let err = params(&[("month", "2024-13")]).display_filters().unwrap_err();

        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn test_page_numbers_clamped_or_rejected() {
        let page = params(&[("page", "0"), ("page_size", "500")]).page(6).unwrap();
        assert_eq!(page, PageRequest::clamped(Some(1), Some(100), 6));

        let err = params(&[("page", "two")]).page(6).unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn test_repo_override() {
        let default: RepoId = "octo/widgets".parse().unwrap();

        assert_eq!(params(&[]).repo(&default).unwrap(), default);
        assert_eq!(
            params(&[("repo", "octo/gadgets")])
                .repo(&default)
                .unwrap()
                .to_string(),
            "octo/gadgets"
        );
        assert!(params(&[("repo", "not-a-repo")]).repo(&default).is_err());
    }

    #[test]
    fn test_card_defaults_to_open() {
        assert_eq!(params(&[]).card().unwrap(), CardKind::Available);
        assert_eq!(params(&[("type", "closed")]).card().unwrap(), CardKind::Closed);
        assert!(params(&[("type", "merged")]).card().is_err());
    }
}
