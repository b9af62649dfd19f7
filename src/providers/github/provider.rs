use async_trait::async_trait;
use log::info;

use super::client::{GitHubClient, PullRequestDto, RequestedReviewersDto};
use crate::auth::Token;
use crate::config::RepoId;
use crate::error::Result;
use crate::providers::{PullRequest, PullRequestSource, PullState};

const GHOST_LOGIN: &str = "ghost";

pub struct GitHubProvider {
    client: GitHubClient,
}

impl GitHubProvider {
    pub fn new(base_url: &str, token: Token) -> Result<Self> {
        let client = GitHubClient::new(base_url, token)?;

        Ok(Self { client })
    }

    fn transform_pull(dto: PullRequestDto, requested_state: PullState) -> PullRequest {
        // The list endpoint is filtered by state, but trust the payload if it disagrees.
        let state = match dto.state.as_str() {
            "open" => PullState::Open,
            "closed" => PullState::Closed,
            _ => requested_state,
        };

        PullRequest {
            number: dto.number,
            title: dto.title,
            author: dto
                .user
                .map_or_else(|| GHOST_LOGIN.to_string(), |u| u.login),
            created_at: dto.created_at,
            updated_at: dto.updated_at,
            state,
            labels: dto.labels.into_iter().map(|l| l.name).collect(),
            requested_reviewers: dto
                .requested_reviewers
                .into_iter()
                .map(|u| u.login)
                .collect(),
            html_url: dto.html_url,
        }
    }

    fn reviewer_logins(dto: RequestedReviewersDto) -> Vec<String> {
        dto.users
            .into_iter()
            .map(|u| u.login)
            .chain(dto.teams.into_iter().map(|t| format!("team:{}", t.slug)))
            .collect()
    }
}

#[async_trait]
impl PullRequestSource for GitHubProvider {
    async fn pull_requests(&self, repo: &RepoId, state: PullState) -> Result<Vec<PullRequest>> {
        let dtos = self.client.fetch_pull_list(repo, state).await?;
        info!("Fetched {} {state} pull requests for {repo}", dtos.len());

        Ok(dtos
            .into_iter()
            .map(|dto| Self::transform_pull(dto, state))
            .collect())
    }

    async fn requested_reviewers(&self, repo: &RepoId, number: u64) -> Result<Vec<String>> {
        let dto = self.client.fetch_requested_reviewers(repo, number).await?;
        Ok(Self::reviewer_logins(dto))
    }
}
