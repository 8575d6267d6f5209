mod cli;
mod config;
mod error;
mod gitlab;
mod metrics;
mod poller;
mod server;
mod tracker;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use log::info;
use prometheus::Registry;

use cli::Cli;
use config::Config;
use gitlab::GitLabClient;
use metrics::PipelineMetrics;
use poller::Poller;
use tracker::PipelineTracker;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    info!("Starting exporter");
    info!(
        "Polling {} every {}s",
        config.gitlab.url, config.polling_interval_seconds
    );
    info!("{} project(s) configured", config.projects.len());

    let registry = Registry::new();
    let metrics = PipelineMetrics::new(&registry)?;
    let tracker = Arc::new(PipelineTracker::new(metrics));
    let client = GitLabClient::new(&config.gitlab.url, config.gitlab.token.as_deref())?;

    let poller = Arc::new(Poller::new(client, tracker, config));
    tokio::spawn(poller.run());

    server::serve(cli.listen_address, registry).await?;

    Ok(())
}
