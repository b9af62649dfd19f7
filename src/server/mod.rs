//! HTTP server exposing the dashboard and ticket APIs.
//!
//! Unmatched `/api/*` paths always get a JSON 404. Everything else falls
//! through to the static directory when one is configured.

mod error;
mod params;
mod routes;

use std::path::Path;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{any, get, post};
use axum::Router;
use log::info;
use tower_http::services::ServeDir;

use crate::cache::{Clock, SystemClock};
use crate::config::Settings;
use crate::dashboard::Dashboard;
use crate::error::Result;
use crate::jira::JiraService;
use crate::providers::github::GitHubProvider;

const UPLOAD_LIMIT_BYTES: usize = 25 * 1024 * 1024;

/// Shared state for the axum routes.
#[derive(Clone)]
pub struct AppState {
    pub dashboard: Arc<Dashboard>,
    pub jira: Arc<JiraService>,
}

pub fn router(state: AppState, static_dir: Option<&Path>) -> Router {
    let app = Router::new()
        .route("/api/pr-stats", get(routes::pr_stats))
        .route("/api/prs", get(routes::pull_requests))
        .route("/api/available-months", get(routes::available_months))
        .route("/api/available-labels", get(routes::available_labels))
        .route("/api/reviewer-stats", get(routes::reviewer_stats))
        .route("/api/refresh", post(routes::refresh))
        .route("/api/cache-info", get(routes::cache_info))
        .route("/api/jira/status", get(routes::jira_status))
        .route("/api/jira/tickets", get(routes::jira_tickets))
        .route("/api/jira/refresh", post(routes::jira_refresh))
        .route(
            "/upload/jira",
            post(routes::upload_jira).layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES)),
        )
        .route("/api/{*rest}", any(routes::api_not_found))
        .with_state(state);

    match static_dir {
        Some(dir) => app.fallback_service(ServeDir::new(dir)),
        None => app,
    }
}

/// Builds the services from `settings` and serves until the process exits.
pub async fn serve(settings: Settings) -> Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let provider = GitHubProvider::new(&settings.api_url, settings.token.clone())?;

    let state = AppState {
        dashboard: Arc::new(Dashboard::new(
            Arc::new(provider),
            settings.repo.clone(),
            settings.fanout,
            clock.clone(),
        )),
        jira: Arc::new(JiraService::new(clock)),
    };
    let app = router(state, settings.static_dir.as_deref());

    let listener = tokio::net::TcpListener::bind(settings.bind).await?;
    info!(
        "Serving dashboard for {} on http://{} (fan-out {})",
        settings.repo, settings.bind, settings.fanout
    );
    if let Some(dir) = &settings.static_dir {
        info!("Static files from {}", dir.display());
    }

    axum::serve(listener, app).await?;
    Ok(())
}
