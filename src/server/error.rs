use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::error;
use serde::Serialize;

use crate::error::DashboardError;

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    kind: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after_secs: Option<u64>,
}

/// Wrapper to make `DashboardError` usable as an axum error response.
pub struct ApiErr(pub DashboardError);

impl ApiErr {
    pub fn not_found(path: &str) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                kind: "not_found",
                message: format!("No API route for {path}"),
                retry_after_secs: None,
            },
        };
        (StatusCode::NOT_FOUND, Json(body)).into_response()
    }
}

fn status_for(err: &DashboardError) -> StatusCode {
    match err {
        DashboardError::UpstreamRateLimit { .. } => StatusCode::TOO_MANY_REQUESTS,
        DashboardError::UpstreamNotFound(_) => StatusCode::NOT_FOUND,
        DashboardError::UpstreamAuth(_)
        | DashboardError::Upstream { .. }
        | DashboardError::Network(_) => StatusCode::BAD_GATEWAY,
        DashboardError::Validation(_) | DashboardError::Spreadsheet(_) => StatusCode::BAD_REQUEST,
        DashboardError::PartialFetch(_)
        | DashboardError::Config(_)
        | DashboardError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiErr {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        let retry_after_secs = match &self.0 {
            DashboardError::UpstreamRateLimit { retry_after } => *retry_after,
            _ => None,
        };

        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        }

        let body = ErrorBody {
            error: ErrorDetail {
                kind: self.0.kind(),
                message: self.0.to_string(),
                retry_after_secs,
            },
        };
        let mut response = (status, Json(body)).into_response();

        if let Some(secs) = retry_after_secs {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

impl From<DashboardError> for ApiErr {
    fn from(err: DashboardError) -> Self {
        Self(err)
    }
}
