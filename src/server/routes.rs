//! JSON handlers for the dashboard API.

use std::sync::Arc;

use axum::extract::{Multipart, Query, State};
use axum::http::Uri;
use axum::response::Response;
use axum::Json;
use log::info;
use serde::Serialize;

use super::error::ApiErr;
use super::params::Params;
use super::AppState;
use crate::cache::CacheInfo;
use crate::dashboard::{DashboardCacheInfo, PR_PAGE_SIZE, REVIEWER_PAGE_SIZE};
use crate::error::DashboardError;
use crate::insights::{PrStats, PrSummary, ReviewerWorkload};
use crate::jira::{JiraSummary, Ticket, UploadSummary, TICKET_PAGE_SIZE};
use crate::pagination::Page;

type ApiResult<T> = Result<Json<T>, ApiErr>;
type RawQuery = Query<Vec<(String, String)>>;

const UPLOAD_FIELD: &str = "file";

/// GET /api/pr-stats — card totals.
pub async fn pr_stats(State(state): State<AppState>, Query(query): RawQuery) -> ApiResult<PrStats> {
    let params = Params::new(query);
    let repo = params.repo(state.dashboard.default_repo())?;
    let filters = params.display_filters()?;

    Ok(Json(state.dashboard.pr_stats(&repo, &filters).await?))
}

/// GET /api/prs — page of pull requests behind one card.
pub async fn pull_requests(
    State(state): State<AppState>,
    Query(query): RawQuery,
) -> ApiResult<Page<PrSummary>> {
    let params = Params::new(query);
    let repo = params.repo(state.dashboard.default_repo())?;
    let card = params.card()?;
    let filters = params.display_filters()?;
    let page = params.page(PR_PAGE_SIZE)?;

    Ok(Json(
        state
            .dashboard
            .pull_requests(&repo, card, &filters, page)
            .await?,
    ))
}

pub async fn available_months(
    State(state): State<AppState>,
    Query(query): RawQuery,
) -> ApiResult<Vec<String>> {
    let repo = Params::new(query).repo(state.dashboard.default_repo())?;
    Ok(Json(state.dashboard.available_months(&repo).await?))
}

pub async fn available_labels(
    State(state): State<AppState>,
    Query(query): RawQuery,
) -> ApiResult<Vec<String>> {
    let repo = Params::new(query).repo(state.dashboard.default_repo())?;
    Ok(Json(state.dashboard.available_labels(&repo).await?))
}

/// GET /api/reviewer-stats — reviewer workload, busiest first.
pub async fn reviewer_stats(
    State(state): State<AppState>,
    Query(query): RawQuery,
) -> ApiResult<ReviewerWorkload> {
    let params = Params::new(query);
    let repo = params.repo(state.dashboard.default_repo())?;
    let page = params.page(REVIEWER_PAGE_SIZE)?;

    Ok(Json(state.dashboard.reviewer_workload(&repo, page).await?))
}

#[derive(Serialize)]
pub struct RefreshResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    repository: Option<String>,
    refreshed: bool,
}

/// POST /api/refresh — drops one repository's PR snapshot.
pub async fn refresh(
    State(state): State<AppState>,
    Query(query): RawQuery,
) -> ApiResult<RefreshResponse> {
    let repo = Params::new(query).repo(state.dashboard.default_repo())?;
    let refreshed = state.dashboard.refresh(&repo);

    Ok(Json(RefreshResponse {
        repository: Some(repo.to_string()),
        refreshed,
    }))
}

#[derive(Serialize)]
pub struct CacheInfoResponse {
    #[serde(flatten)]
    dashboard: DashboardCacheInfo,
    jira_summary: CacheInfo,
    default_repository: String,
    default_snapshot_fetched_at: Option<chrono::DateTime<chrono::Utc>>,
}

pub async fn cache_info(State(state): State<AppState>) -> Json<CacheInfoResponse> {
    let repo = state.dashboard.default_repo();

    Json(CacheInfoResponse {
        dashboard: state.dashboard.cache_info(),
        jira_summary: state.jira.cache_info(),
        default_repository: repo.to_string(),
        default_snapshot_fetched_at: state.dashboard.snapshot_fetched_at(repo),
    })
}

pub async fn jira_status(State(state): State<AppState>) -> Json<JiraSummary> {
    Json(state.jira.status_summary().as_ref().clone())
}

/// GET /api/jira/tickets — page of uploaded tickets.
pub async fn jira_tickets(
    State(state): State<AppState>,
    Query(query): RawQuery,
) -> ApiResult<Page<Ticket>> {
    let params = Params::new(query);
    let category = params.status()?;
    let page = params.page(TICKET_PAGE_SIZE)?;

    Ok(Json(state.jira.tickets(category, page)))
}

/// POST /api/jira/refresh — drops the cached ticket summary only.
pub async fn jira_refresh(State(state): State<AppState>) -> Json<RefreshResponse> {
    Json(RefreshResponse {
        repository: None,
        refreshed: state.jira.refresh(),
    })
}

/// POST /upload/jira — replaces the ticket set with an uploaded export.
pub async fn upload_jira(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<UploadSummary> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| DashboardError::validation(format!("malformed multipart body: {e}")))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| DashboardError::validation(format!("could not read upload: {e}")))?;
        upload = Some((filename, bytes));
    }

    let (filename, bytes) = upload.ok_or_else(|| {
        DashboardError::validation(format!("multipart field '{UPLOAD_FIELD}' is required"))
    })?;
    info!("Received ticket export {filename} ({} bytes)", bytes.len());

    let jira = Arc::clone(&state.jira);
    let summary = tokio::task::spawn_blocking(move || jira.upload(&filename, &bytes))
        .await
        .map_err(|e| DashboardError::Io(std::io::Error::other(e)))??;

    Ok(Json(summary))
}

/// Unmatched `/api/*` paths.
pub async fn api_not_found(uri: Uri) -> Response {
    ApiErr::not_found(uri.path())
}
