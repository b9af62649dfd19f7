use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::auth::Token;
use crate::error::{DashboardError, Result};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_FANOUT: usize = 10;

/// A GitHub repository in `owner/name` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepoId {
    owner: String,
    name: String,
}

impl RepoId {
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl FromStr for RepoId {
    type Err = DashboardError;

    fn from_str(value: &str) -> Result<Self> {
        let value = value.trim();
        let invalid = || {
            DashboardError::validation(format!(
                "repository '{value}' must be in owner/name form"
            ))
        };

        let (owner, name) = value.split_once('/').ok_or_else(invalid)?;
        let well_formed = |part: &str| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        };
        if !well_formed(owner) || !well_formed(name) {
            return Err(invalid());
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Validated runtime settings for the `serve` command.
#[derive(Debug, Clone)]
pub struct Settings {
    pub repo: RepoId,
    pub token: Token,
    pub api_url: String,
    pub bind: SocketAddr,
    pub fanout: usize,
    pub static_dir: Option<PathBuf>,
}

impl Settings {
    pub fn new(
        repo: &str,
        token: &str,
        api_url: &str,
        bind: &str,
        fanout: usize,
        static_dir: Option<PathBuf>,
    ) -> Result<Self> {
        if repo.trim().is_empty() {
            return Err(DashboardError::Config(
                "GITHUB_REPO is required (owner/name)".to_string(),
            ));
        }
        let repo = repo
            .parse::<RepoId>()
            .map_err(|e| DashboardError::Config(e.to_string()))?;

        let token = Token::from(token);
        if token.is_empty() {
            return Err(DashboardError::Config(
                "GITHUB_TOKEN is required".to_string(),
            ));
        }

        let bind = bind
            .parse::<SocketAddr>()
            .map_err(|e| DashboardError::Config(format!("Invalid bind address '{bind}': {e}")))?;

        if fanout == 0 {
            return Err(DashboardError::Config(
                "fan-out pool size must be at least 1".to_string(),
            ));
        }

        if let Some(dir) = &static_dir {
            if !dir.is_dir() {
                return Err(DashboardError::Config(format!(
                    "Static directory '{}' does not exist",
                    dir.display()
                )));
            }
        }

        Ok(Self {
            repo,
            token,
            api_url: api_url.to_string(),
            bind,
            fanout,
            static_dir,
        })
    }
}
