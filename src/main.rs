mod auth;
mod cache;
mod cli;
mod config;
mod dashboard;
mod error;
mod insights;
mod jira;
mod pagination;
mod providers;
mod server;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use env_logger::Env;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    info!("Starting prdash - pull request dashboard");
    cli.execute().await?;

    Ok(())
}
