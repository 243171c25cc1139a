mod auth;
mod builds;
mod cli;
mod config;
mod error;
mod feed;
mod monitor;
mod notifier;
mod output;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    output::print_banner();

    let cli = Cli::parse();
    info!("Starting buildwatch");
    cli.execute().await?;

    Ok(())
}
