use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;

use crate::config::{Settings, DEFAULT_API_URL, DEFAULT_FANOUT};
use crate::server;

#[derive(Parser)]
#[command(name = "prdash")]
#[command(author, version, about = "Pull request and Jira ticket dashboard", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the dashboard API
    Serve {
        /// Repository to report on (e.g., "owner/name")
        #[arg(short, long, env = "GITHUB_REPO", default_value = "")]
        repo: String,

        /// GitHub API token
        #[arg(short, long, env = "GITHUB_TOKEN", default_value = "", hide_env_values = true)]
        token: String,

        /// GitHub API base URL
        #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
        api_url: String,

        /// Address to listen on
        #[arg(short, long, env = "PRDASH_BIND", default_value = "0.0.0.0:5000")]
        bind: String,

        /// Maximum concurrent review-request lookups
        #[arg(long, env = "PRDASH_FANOUT", default_value_t = DEFAULT_FANOUT)]
        fanout: usize,

        /// Directory of static frontend files
        #[arg(long, env = "PRDASH_STATIC_DIR")]
        static_dir: Option<PathBuf>,
    },
}

impl Cli {
    pub async fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Serve {
                repo,
                token,
                api_url,
                bind,
                fanout,
                static_dir,
            } => {
                let settings =
                    Settings::new(repo, token, api_url, bind, *fanout, static_dir.clone())?;
                info!("Starting dashboard server for {}", settings.repo);

                server::serve(settings).await?;
                Ok(())
            }
        }
    }
}
