use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("GitHub rejected the credentials: {0}")]
    UpstreamAuth(String),

    #[error("GitHub rate limit exceeded{}", retry_hint(.retry_after))]
    UpstreamRateLimit { retry_after: Option<u64> },

    #[error("Not found upstream: {0}")]
    UpstreamNotFound(String),

    #[error("GitHub API request failed ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("Partial fetch failure: {0}")]
    PartialFetch(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Spreadsheet could not be read: {0}")]
    Spreadsheet(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn retry_hint(retry_after: &Option<u64>) -> String {
    retry_after
        .map(|secs| format!(", retry after {secs}s"))
        .unwrap_or_default()
}

impl DashboardError {
    /// Stable identifier exposed in error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UpstreamAuth(_) => "upstream_auth",
            Self::UpstreamRateLimit { .. } => "upstream_rate_limit",
            Self::UpstreamNotFound(_) => "upstream_not_found",
            Self::Upstream { .. } => "upstream",
            Self::PartialFetch(_) => "partial_fetch",
            Self::Validation(_) => "validation",
            Self::Config(_) => "config",
            Self::Spreadsheet(_) => "spreadsheet",
            Self::Network(_) => "network",
            Self::Io(_) => "io",
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<csv::Error> for DashboardError {
    fn from(err: csv::Error) -> Self {
        Self::Spreadsheet(err.to_string())
    }
}

impl From<calamine::Error> for DashboardError {
    fn from(err: calamine::Error) -> Self {
        Self::Spreadsheet(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_message_includes_retry_hint() {
        let err = DashboardError::UpstreamRateLimit {
            retry_after: Some(42),
        };
        assert_eq!(err.to_string(), "GitHub rate limit exceeded, retry after 42s");
        assert_eq!(err.kind(), "upstream_rate_limit");
    }

    #[test]
    fn test_rate_limit_message_without_hint() {
        let err = DashboardError::UpstreamRateLimit { retry_after: None };
        assert_eq!(err.to_string(), "GitHub rate limit exceeded");
    }

    #[test]
    fn test_validation_kind() {
        let err = DashboardError::validation("month must be YYYY-MM");
        assert_eq!(err.kind(), "validation");
        assert_eq!(err.to_string(), "Invalid request: month must be YYYY-MM");
    }
}
