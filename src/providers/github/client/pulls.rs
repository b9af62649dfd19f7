use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::core::GitHubClient;
use crate::config::RepoId;
use crate::error::Result;
use crate::providers::PullState;

const PER_PAGE: &str = "100";

#[derive(Debug, Deserialize)]
pub struct UserDto {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub struct LabelDto {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct TeamDto {
    pub slug: String,
}

#[derive(Debug, Deserialize)]
pub struct PullRequestDto {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub html_url: String,
    /// `null` for deleted ("ghost") accounts.
    pub user: Option<UserDto>,
    #[serde(default)]
    pub labels: Vec<LabelDto>,
    #[serde(default)]
    pub requested_reviewers: Vec<UserDto>,
}

#[derive(Debug, Deserialize)]
pub struct RequestedReviewersDto {
    #[serde(default)]
    pub users: Vec<UserDto>,
    #[serde(default)]
    pub teams: Vec<TeamDto>,
}

impl GitHubClient {
    /// Every pull request in `state`, newest first.
    pub async fn fetch_pull_list(
        &self,
        repo: &RepoId,
        state: PullState,
    ) -> Result<Vec<PullRequestDto>> {
        let url = self.repo_url(repo, &["pulls"])?;
        let query = [
            ("state", state.as_str()),
            ("per_page", PER_PAGE),
            ("sort", "created"),
            ("direction", "desc"),
        ];

        self.get_all_pages(url, &query, &format!("{state} pull requests of {repo}"))
            .await
    }

    pub async fn fetch_requested_reviewers(
        &self,
        repo: &RepoId,
        number: u64,
    ) -> Result<RequestedReviewersDto> {
        let number = number.to_string();
        let url = self.repo_url(repo, &["pulls", number.as_str(), "requested_reviewers"])?;

        self.get_json(url, &format!("review requests of {repo}#{number}"))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Token;
    use crate::error::DashboardError;
    use mockito::Matcher;

    fn repo() -> RepoId {
        "octo/widgets".parse().unwrap()
    }

    fn pull_json(number: u64, state: &str) -> serde_json::Value {
        serde_json::json!({
            "number": number,
            "title": format!("PR {number}"),
            "state": state,
            "created_at": "2024-02-10T09:00:00Z",
            "updated_at": "2024-02-11T09:00:00Z",
            "html_url": format!("https://github.com/octo/widgets/pull/{number}"),
            "user": { "login": "alice" },
            "labels": [{ "name": "bug" }],
            "requested_reviewers": [{ "login": "bob" }]
        })
    }

    #[tokio::test]
    async fn test_fetch_pull_list_drains_all_pages() {
        let mut server = mockito::Server::new_async().await;
        let next = format!(
            "<{}/repos/octo/widgets/pulls?state=open&page=2>; rel=\"next\"",
            server.url()
        );

        let first = server
            .mock("GET", "/repos/octo/widgets/pulls")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("state".into(), "open".into()),
                Matcher::UrlEncoded("per_page".into(), "100".into()),
            ]))
            .match_header("authorization", "Bearer ghp_test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_header("link", &next)
            .with_body(serde_json::json!([pull_json(1, "open"), pull_json(2, "open")]).to_string())
            .create_async()
            .await;

        let second = server
            .mock("GET", "/repos/octo/widgets/pulls")
            .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(serde_json::json!([pull_json(3, "open")]).to_string())
            .create_async()
            .await;

        let client = GitHubClient::new(&server.url(), Token::from("ghp_test")).unwrap();
        let pulls = client.fetch_pull_list(&repo(), PullState::Open).await.unwrap();

        first.assert_async().await;
        second.assert_async().await;
        let numbers: Vec<u64> = pulls.iter().map(|p| p.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(pulls[0].user.as_ref().unwrap().login, "alice");
        assert_eq!(pulls[0].labels[0].name, "bug");
    }

    #[tokio::test]
    async fn test_fetch_pull_list_tolerates_ghost_author() {
        let mut server = mockito::Server::new_async().await;
        let mut body = pull_json(9, "closed");
        body["user"] = serde_json::Value::Null;

        let _mock = server
            .mock("GET", "/repos/octo/widgets/pulls")
            .match_query(Matcher::UrlEncoded("state".into(), "closed".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(serde_json::json!([body]).to_string())
            .create_async()
            .await;

        let client = GitHubClient::new(&server.url(), Token::from("ghp_test")).unwrap();
        let pulls = client.fetch_pull_list(&repo(), PullState::Closed).await.unwrap();

        assert_eq!(pulls.len(), 1);
        assert!(pulls[0].user.is_none());
    }

    #[tokio::test]
    async fn test_fetch_pull_list_maps_missing_repository() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/repos/octo/widgets/pulls")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"message":"Not Found"}"#)
            .create_async()
            .await;

        let client = GitHubClient::new(&server.url(), Token::from("ghp_test")).unwrap();
        let err = client
            .fetch_pull_list(&repo(), PullState::Open)
            .await
            .unwrap_err();

        assert!(matches!(err, DashboardError::UpstreamNotFound(_)));
    }

    #[tokio::test]
    async fn test_fetch_pull_list_maps_rate_limit() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/repos/octo/widgets/pulls")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_header("x-ratelimit-remaining", "0")
            .with_header("retry-after", "120")
            .with_body(r#"{"message":"API rate limit exceeded"}"#)
            .create_async()
            .await;

        let client = GitHubClient::new(&server.url(), Token::from("ghp_test")).unwrap();
        let err = client
            .fetch_pull_list(&repo(), PullState::Open)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DashboardError::UpstreamRateLimit {
                retry_after: Some(120)
            }
        ));
    }

    #[tokio::test]
    async fn test_fetch_requested_reviewers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/repos/octo/widgets/pulls/42/requested_reviewers")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "users": [{ "login": "carol" }, { "login": "dave" }],
                    "teams": [{ "slug": "core" }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = GitHubClient::new(&server.url(), Token::from("ghp_test")).unwrap();
        let reviewers = client.fetch_requested_reviewers(&repo(), 42).await.unwrap();

        mock.assert_async().await;
        let logins: Vec<&str> = reviewers.users.iter().map(|u| u.login.as_str()).collect();
        assert_eq!(logins, vec!["carol", "dave"]);
        assert_eq!(reviewers.teams[0].slug, "core");
    }
}
