use chrono::Utc;
use log::debug;
use reqwest::header::{HeaderMap, ACCEPT};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::auth::Token;
use crate::config::RepoId;
use crate::error::{DashboardError, Result};

const USER_AGENT: &str = "prdash/0.1.0";
const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";

pub struct GitHubClient {
    client: Client,
    api_url: Url,
    token: Token,
}

impl GitHubClient {
    pub fn new(base_url: &str, token: Token) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| DashboardError::Config(format!("Failed to create HTTP client: {e}")))?;

        // Keep any path prefix (GitHub Enterprise serves the API under /api/v3).
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let api_url = Url::parse(&normalized)
            .map_err(|e| DashboardError::Config(format!("Invalid API base URL: {e}")))?;

        Ok(Self {
            client,
            api_url,
            token,
        })
    }

    pub fn auth_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .bearer_auth(self.token.as_str())
            .header(ACCEPT, GITHUB_MEDIA_TYPE)
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
    }

    /// `{api}/repos/{owner}/{name}/{tail..}`
    pub fn repo_url(&self, repo: &RepoId, tail: &[&str]) -> Result<Url> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|()| DashboardError::Config("API base URL cannot have a path".to_string()))?
            .pop_if_empty()
            .extend(["repos", repo.owner(), repo.name()])
            .extend(tail);
        Ok(url)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: Url, resource: &str) -> Result<T> {
        let response = self.auth_request(self.client.get(url)).send().await?;
        let response = check_response(response, resource).await?;
        Ok(response.json::<T>().await?)
    }

    /// Follows `Link: rel="next"` until the collection is exhausted.
    pub async fn get_all_pages<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, &str)],
        resource: &str,
    ) -> Result<Vec<T>> {
        let mut all = Vec::new();
        let mut request = self.client.get(url).query(query);
        let mut page = 1;

        loop {
            let response = self.auth_request(request).send().await?;
            let response = check_response(response, resource).await?;
            let next = parse_link_next(response.headers());
            log_rate_budget(response.headers());

            let items = response.json::<Vec<T>>().await?;
            debug!("{resource}: page {page} returned {} items", items.len());
            all.extend(items);

            match next {
                Some(next_url) => {
                    let next_url = Url::parse(&next_url).map_err(|e| DashboardError::Upstream {
                        status: 200,
                        message: format!("Malformed pagination link '{next_url}': {e}"),
                    })?;
                    request = self.client.get(next_url);
                    page += 1;
                }
                None => break,
            }
        }

        Ok(all)
    }
}

fn log_rate_budget(headers: &HeaderMap) {
    if let Some(remaining) = header_str(headers, "x-ratelimit-remaining") {
        debug!("GitHub rate limit remaining: {remaining}");
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

async fn check_response(response: Response, resource: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let headers = response.headers().clone();
    let body = response.text().await.unwrap_or_default();
    Err(classify_failure(
        status,
        &headers,
        &body,
        resource,
        Utc::now().timestamp(),
    ))
}

/// Maps a failed GitHub response onto the error taxonomy.
fn classify_failure(
    status: StatusCode,
    headers: &HeaderMap,
    body: &str,
    resource: &str,
    now_epoch: i64,
) -> DashboardError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());

    let budget_exhausted = header_str(headers, "x-ratelimit-remaining") == Some("0");
    let mentions_rate_limit = message.to_lowercase().contains("rate limit");

    match status {
        StatusCode::TOO_MANY_REQUESTS => DashboardError::UpstreamRateLimit {
            retry_after: retry_after_secs(headers, now_epoch),
        },
        StatusCode::FORBIDDEN if budget_exhausted || mentions_rate_limit => {
            DashboardError::UpstreamRateLimit {
                retry_after: retry_after_secs(headers, now_epoch),
            }
        }
        StatusCode::UNAUTHORIZED => DashboardError::UpstreamAuth(format!(
            "token was rejected while fetching {resource}"
        )),
        StatusCode::FORBIDDEN => DashboardError::UpstreamAuth(format!(
            "token lacks permission to read {resource}"
        )),
        StatusCode::NOT_FOUND => DashboardError::UpstreamNotFound(resource.to_string()),
        _ => DashboardError::Upstream {
            status: status.as_u16(),
            message,
        },
    }
}

fn retry_after_secs(headers: &HeaderMap, now_epoch: i64) -> Option<u64> {
    if let Some(secs) = header_str(headers, "retry-after").and_then(|v| v.trim().parse().ok()) {
        return Some(secs);
    }

    let reset = header_str(headers, "x-ratelimit-reset")?.trim().parse::<i64>().ok()?;
    u64::try_from(reset.saturating_sub(now_epoch).max(0)).ok()
}

/// Parse the `Link` header to find the `rel="next"` URL.
fn parse_link_next(headers: &HeaderMap) -> Option<String> {
    let link = header_str(headers, "link")?;
    link.split(',').find_map(|part| {
        let (target, params) = part.trim().split_once(';')?;
        let is_next = params
            .split(';')
            .any(|p| p.trim().replace(' ', "") == "rel=\"next\"");
        if !is_next {
            return None;
        }
        target
            .trim()
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(str::to_string)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, value.parse().unwrap());
        }
        map
    }

    #[test]
    fn test_parse_link_next_finds_next_url() {
        let map = headers(&[(
            "link",
            "<https://api.github.com/repositories/1/pulls?page=2>; rel=\"next\", <https://api.github.com/repositories/1/pulls?page=5>; rel=\"last\"",
        )]);

        assert_eq!(
            parse_link_next(&map).as_deref(),
            Some("https://api.github.com/repositories/1/pulls?page=2")
        );
    }

    #[test]
    fn test_parse_link_next_none_on_last_page() {
        let map = headers(&[(
            "link",
            "<https://api.github.com/repositories/1/pulls?page=1>; rel=\"prev\", <https://api.github.com/repositories/1/pulls?page=1>; rel=\"first\"",
        )]);

        assert_eq!(parse_link_next(&map), None);
        assert_eq!(parse_link_next(&HeaderMap::new()), None);
    }

    #[test]
    fn test_repo_url_keeps_enterprise_prefix() {
        let client = GitHubClient::new("https://ghe.example.com/api/v3", Token::from("t")).unwrap();
        let repo: RepoId = "octo/widgets".parse().unwrap();

        let url = client.repo_url(&repo, &["pulls", "7", "requested_reviewers"]).unwrap();

        assert_eq!(
            url.as_str(),
            "https://ghe.example.com/api/v3/repos/octo/widgets/pulls/7/requested_reviewers"
        );
    }

    #[test]
    fn test_classify_unauthorized_as_auth() {
        let err = classify_failure(
            StatusCode::UNAUTHORIZED,
            &HeaderMap::new(),
            r#"{"message":"Bad credentials"}"#,
            "pull requests",
            0,
        );

        assert!(matches!(err, DashboardError::UpstreamAuth(_)));
    }

    #[test]
    fn test_classify_exhausted_budget_as_rate_limit_with_reset_hint() {
        let map = headers(&[
            ("x-ratelimit-remaining", "0"),
            ("x-ratelimit-reset", "1700000060"),
        ]);

        let err = classify_failure(StatusCode::FORBIDDEN, &map, "{}", "pull requests", 1_700_000_000);

        match err {
            DashboardError::UpstreamRateLimit { retry_after } => assert_eq!(retry_after, Some(60)),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_classify_secondary_rate_limit_uses_retry_after() {
        let map = headers(&[("retry-after", "30")]);

        let err = classify_failure(
            StatusCode::FORBIDDEN,
            &map,
            r#"{"message":"You have exceeded a secondary rate limit."}"#,
            "pull requests",
            0,
        );

        assert!(matches!(
            err,
            DashboardError::UpstreamRateLimit {
                retry_after: Some(30)
            }
        ));
    }

    #[test]
    fn test_classify_plain_forbidden_as_auth() {
        let err = classify_failure(
            StatusCode::FORBIDDEN,
            &headers(&[("x-ratelimit-remaining", "4999")]),
            r#"{"message":"Resource not accessible by integration"}"#,
            "pull requests",
            0,
        );

        assert!(matches!(err, DashboardError::UpstreamAuth(_)));
    }

    #[test]
    fn test_classify_not_found_and_server_errors() {
        let not_found = classify_failure(StatusCode::NOT_FOUND, &HeaderMap::new(), "", "repo", 0);
        assert!(matches!(not_found, DashboardError::UpstreamNotFound(_)));

        let server = classify_failure(
            StatusCode::BAD_GATEWAY,
            &HeaderMap::new(),
            "upstream broke",
            "repo",
            0,
        );
        match server {
            DashboardError::Upstream { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "upstream broke");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
